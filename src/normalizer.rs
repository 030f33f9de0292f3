// Normalizer - raw yt-dlp entries to canonical video records

use url::Url;

use crate::links;
use crate::models::{RawItem, RawThumbnail, VideoRecord};

/// Default upper bound on thumbnail width
pub const DEFAULT_MAX_THUMBNAIL_WIDTH: u32 = 1280;

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    pub max_thumbnail_width: u32,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_thumbnail_width: DEFAULT_MAX_THUMBNAIL_WIDTH,
        }
    }
}

/// Placeholder thumbnail for a video id. Always resolvable on YouTube's CDN.
pub fn placeholder_thumbnail(id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn is_http(raw: &str) -> bool {
    raw.starts_with("https://") || raw.starts_with("http://")
}

fn resolve_id(raw: &RawItem) -> Option<String> {
    if let Some(id) = non_empty(raw.id.as_deref()) {
        return Some(id.to_string());
    }

    [raw.url.as_deref(), raw.webpage_url.as_deref()]
        .into_iter()
        .flatten()
        .filter_map(|u| Url::parse(u).ok())
        .find_map(|u| links::video_id(&u))
}

fn resolve_duration(raw: Option<f64>) -> Option<u64> {
    raw.filter(|d| d.is_finite() && *d >= 0.0)
        .map(|d| d.round() as u64)
}

fn usable(thumb: &RawThumbnail) -> Option<&str> {
    non_empty(thumb.url.as_deref()).filter(|u| is_http(u))
}

/// Largest thumbnail whose width is known and within the limit
fn pick_thumbnail(raw: &RawItem, max_width: u32) -> Option<String> {
    let sized = raw
        .thumbnails
        .iter()
        .filter_map(|t| {
            let url = usable(t)?;
            let width = t.width?;
            (width <= max_width).then(|| {
                let area = u64::from(width) * u64::from(t.height.unwrap_or(0));
                (width, area, url)
            })
        })
        .max_by_key(|(width, area, _)| (*area, *width));

    if let Some((_, _, url)) = sized {
        return Some(url.to_string());
    }

    if let Some(url) = non_empty(raw.thumbnail.as_deref()).filter(|u| is_http(u)) {
        return Some(url.to_string());
    }

    // yt-dlp lists thumbnails from worst to best
    raw.thumbnails.iter().rev().find_map(usable).map(str::to_string)
}

fn resolve_source_url(raw: &RawItem, id: &str) -> String {
    non_empty(raw.webpage_url.as_deref())
        .or_else(|| non_empty(raw.url.as_deref()).filter(|u| is_http(u)))
        .map(str::to_string)
        .unwrap_or_else(|| links::watch_url(id))
}

/// Map a raw entry to a `VideoRecord`. Entries without a resolvable id are dropped.
pub fn normalize(raw: &RawItem, options: &NormalizeOptions) -> Option<VideoRecord> {
    let id = resolve_id(raw)?;

    let thumbnail_url = pick_thumbnail(raw, options.max_thumbnail_width)
        .unwrap_or_else(|| placeholder_thumbnail(&id));

    Some(VideoRecord {
        title: non_empty(raw.title.as_deref()).unwrap_or("").to_string(),
        duration_seconds: resolve_duration(raw.duration),
        thumbnail_url: Some(thumbnail_url),
        source_url: resolve_source_url(raw, &id),
        id,
    })
}
