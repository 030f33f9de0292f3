// YouTube link classification
//
// Only used to detect intent up front; yt-dlp stays the authority on what a
// URL actually contains.

use regex::Regex;
use url::Url;

lazy_static::lazy_static! {
    static ref VIDEO_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap();
}

/// What a URL points at, as far as its shape tells
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    /// A single video with no playlist context
    Video { id: String },
    /// A playlist, possibly opened at one of its videos
    Playlist {
        list_id: String,
        video_id: Option<String>,
    },
    /// Channel or user page (yt-dlp lists its uploads)
    Channel,
    /// Not a YouTube URL we recognise
    Other,
}

impl LinkKind {
    pub fn is_single_video(&self) -> bool {
        matches!(self, Self::Video { .. })
    }
}

fn is_youtube_host(host: &str) -> bool {
    let host = host.trim_start_matches("www.").trim_start_matches("m.");
    matches!(
        host,
        "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" | "youtu.be"
    )
}

/// Check if a string looks like a YouTube video id
pub fn is_video_id(candidate: &str) -> bool {
    VIDEO_ID_RE.is_match(candidate)
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find_map(|(k, v)| (k == key).then(|| v.trim().to_string()))
        .filter(|v| !v.is_empty())
}

/// Extract the video id a URL refers to, if any
pub fn video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    if !is_youtube_host(host) {
        return None;
    }

    if host.ends_with("youtu.be") {
        let id = url.path_segments()?.next()?;
        return is_video_id(id).then(|| id.to_string());
    }

    if let Some(id) = query_value(url, "v") {
        return is_video_id(&id).then_some(id);
    }

    let mut segments = url.path_segments()?;
    match segments.next()? {
        "shorts" | "embed" | "live" | "v" => {
            let id = segments.next()?;
            is_video_id(id).then(|| id.to_string())
        }
        _ => None,
    }
}

/// Classify a parsed URL
pub fn classify(url: &Url) -> LinkKind {
    let Some(host) = url.host_str() else {
        return LinkKind::Other;
    };
    if !is_youtube_host(host) {
        return LinkKind::Other;
    }

    let video = video_id(url);
    if let Some(list_id) = query_value(url, "list") {
        return LinkKind::Playlist {
            list_id,
            video_id: video,
        };
    }

    if let Some(id) = video {
        return LinkKind::Video { id };
    }

    let path = url.path();
    if path.starts_with("/channel/")
        || path.starts_with("/c/")
        || path.starts_with("/user/")
        || path.starts_with("/@")
    {
        return LinkKind::Channel;
    }

    LinkKind::Other
}

/// Classify a raw string; unparsable input is `Other`
pub fn classify_str(raw: &str) -> LinkKind {
    Url::parse(raw.trim())
        .map(|url| classify(&url))
        .unwrap_or(LinkKind::Other)
}

/// Canonical watch URL for a video id
pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}
