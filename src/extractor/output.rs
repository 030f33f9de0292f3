// Line-delimited JSON parsing for yt-dlp output

use crate::models::RawItem;

/// Entries recovered from one run of stdout
#[derive(Debug, Default)]
pub struct ParsedOutput {
    pub items: Vec<RawItem>,
    /// First playlist-level title seen on any entry
    pub playlist_title: Option<String>,
    /// Lines that were not valid entry objects
    pub malformed: usize,
    /// Entries pointing at other lists (channel tabs and the like)
    pub nested: usize,
    /// Where those nested lists live, when the entry said so
    pub tab_urls: Vec<String>,
}

/// Parse one JSON object per line. Bad lines are skipped, never fatal.
pub fn parse_lines(stdout: &str) -> ParsedOutput {
    let mut parsed = ParsedOutput::default();

    for (idx, line) in stdout.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let item = match serde_json::from_str::<RawItem>(line) {
            Ok(item) => item,
            Err(e) => {
                parsed.malformed += 1;
                tracing::warn!(line = idx + 1, error = %e, "skipping malformed extractor line");
                continue;
            }
        };

        if item.is_nested_list() {
            parsed.nested += 1;
            tracing::debug!(line = idx + 1, id = ?item.id, "skipping nested list entry");
            if let Some(url) = [item.url.as_deref(), item.webpage_url.as_deref()]
                .into_iter()
                .flatten()
                .find(|u| u.starts_with("https://") || u.starts_with("http://"))
            {
                parsed.tab_urls.push(url.to_string());
            }
            continue;
        }

        if parsed.playlist_title.is_none() {
            parsed.playlist_title = item
                .playlist_title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
        }

        parsed.items.push(item);
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_line_does_not_lose_the_rest() {
        let stdout = concat!(
            r#"{"id":"a","title":"A","playlist_title":"Mix"}"#,
            "\n",
            r#"{"id":"b","title":"#,
            "\n",
            "WARNING: not json at all\n",
            "\n",
            r#"{"id":"c","title":"C"}"#,
            "\n",
        );

        let parsed = parse_lines(stdout);
        let ids: Vec<_> = parsed.items.iter().filter_map(|i| i.id.as_deref()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(parsed.malformed, 2);
        assert_eq!(parsed.playlist_title.as_deref(), Some("Mix"));
    }

    #[test]
    fn test_non_object_lines_are_malformed() {
        let parsed = parse_lines("[1,2]\n\"text\"\n42\n");
        assert!(parsed.items.is_empty());
        assert_eq!(parsed.malformed, 3);
    }

    #[test]
    fn test_nested_lists_skipped() {
        let stdout = concat!(
            r#"{"_type":"url","ie_key":"YoutubeTab","id":"UCx","title":"Videos","url":"https://www.youtube.com/@x/videos"}"#,
            "\n",
            r#"{"_type":"url","ie_key":"Youtube","id":"v1","title":"One"}"#,
            "\n",
        );
        let parsed = parse_lines(stdout);
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.nested, 1);
        assert_eq!(parsed.tab_urls, vec!["https://www.youtube.com/@x/videos"]);
        assert_eq!(parsed.playlist_title, None);
    }
}
