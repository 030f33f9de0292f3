// Data models shared by the extractor, resolver and HTTP layer

use serde::{Deserialize, Deserializer, Serialize};

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One thumbnail candidate as listed by yt-dlp
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawThumbnail {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// One line of yt-dlp JSON output, kept as loose as the tool is.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Seconds; absent for live streams and some flat entries
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub thumbnails: Vec<RawThumbnail>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub playlist_title: Option<String>,
    #[serde(default, rename = "_type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub ie_key: Option<String>,
}

impl RawItem {
    /// Entry that points at another list (channel tab, nested playlist)
    pub fn is_nested_list(&self) -> bool {
        self.item_type.as_deref() == Some("playlist")
            || matches!(self.ie_key.as_deref(), Some("YoutubeTab") | Some("YoutubePlaylist"))
    }
}

/// Canonical video record returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    /// `None` means unknown, which is not the same as zero-length
    pub duration_seconds: Option<u64>,
    pub thumbnail_url: Option<String>,
    pub source_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistKind {
    Playlist,
    Single,
}

/// Response payload for one resolution request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistResult {
    pub kind: PlaylistKind,
    pub title: Option<String>,
    pub videos: Vec<VideoRecord>,
    pub requested_url: String,
    /// The list is shorter than the source: size limit or time budget
    pub truncated: bool,
}

/// Output of a flattened listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    /// Playlist-level title, when the tool reported one
    pub title: Option<String>,
    pub items: Vec<RawItem>,
    /// Produced by the single-video retry after an empty flat listing
    pub single_fallback: bool,
    /// `false` when the deadline hit after some entries had been emitted
    pub complete: bool,
}

/// Output of one chunk invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub items: Vec<RawItem>,
    pub timed_out: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_item_tolerates_extra_fields() {
        let line = r#"{"_type":"url","ie_key":"Youtube","id":"abc","title":"T","duration":61.0,
            "view_count":5,"thumbnails":[{"url":"https://i.ytimg.com/a.jpg","height":94,"width":168}],
            "playlist_title":"Mix"}"#;
        let item: RawItem = serde_json::from_str(line).unwrap();
        assert_eq!(item.id.as_deref(), Some("abc"));
        assert_eq!(item.item_type.as_deref(), Some("url"));
        assert_eq!(item.thumbnails[0].width, Some(168));
        assert_eq!(item.playlist_title.as_deref(), Some("Mix"));
        assert!(!item.is_nested_list());

        let tab: RawItem =
            serde_json::from_str(r#"{"_type":"url","ie_key":"YoutubeTab","id":"UCx","title":"Videos"}"#)
                .unwrap();
        assert!(tab.is_nested_list());

        let live: RawItem = serde_json::from_str(r#"{"id":"x","duration":null,"thumbnails":null}"#).unwrap();
        assert_eq!(live.duration, None);
        assert!(live.thumbnails.is_empty());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = PlaylistResult {
            kind: PlaylistKind::Single,
            title: None,
            videos: vec![VideoRecord {
                id: "abc123".to_string(),
                title: "Clip".to_string(),
                duration_seconds: None,
                thumbnail_url: Some("https://i.ytimg.com/vi/abc123/hqdefault.jpg".to_string()),
                source_url: "https://www.youtube.com/watch?v=abc123".to_string(),
            }],
            requested_url: "https://youtube.com/watch?v=abc123".to_string(),
            truncated: false,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "single");
        assert_eq!(json["requestedUrl"], "https://youtube.com/watch?v=abc123");
        assert_eq!(json["truncated"], false);
        assert!(json["videos"][0]["durationSeconds"].is_null());
        assert_eq!(json["videos"][0]["sourceUrl"], "https://www.youtube.com/watch?v=abc123");
    }
}
