// Extractor diagnostics - classifies yt-dlp failure output
//
// yt-dlp reports every failure as free text on stderr. This module maps
// those messages to a small set of reasons so the adapter can decide whether
// a failure means "bad input", "nothing there" or "try again later".

use serde::Serialize;

use super::errors::FailureReason;

/// Reasons a yt-dlp run can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockingReason {
    /// URL is not something any extractor understands
    UnsupportedUrl,

    /// Video or playlist was deleted, never existed, or was taken down
    VideoUnavailable,

    /// Private video or playlist
    PrivateVideo,

    /// Age-restricted content requiring login
    AgeRestricted,

    /// Geographic restriction
    GeoBlocked,

    /// Rate limiting (429 or similar)
    RateLimited,

    /// "Sign in to confirm you're not a bot" and friends
    BotDetection,

    /// HTTP 403 Forbidden
    Http403Forbidden,

    /// Network level timeout inside yt-dlp
    NetworkTimeout,

    /// Anything else
    Unknown,
}

impl BlockingReason {
    /// Failure category reported to clients
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            Self::UnsupportedUrl => FailureReason::InvalidUrl,
            Self::VideoUnavailable
            | Self::PrivateVideo
            | Self::AgeRestricted
            | Self::GeoBlocked => FailureReason::EmptyResult,
            Self::RateLimited
            | Self::BotDetection
            | Self::Http403Forbidden
            | Self::NetworkTimeout
            | Self::Unknown => FailureReason::ProcessFailure,
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::UnsupportedUrl => "URL is not a recognised video or playlist",
            Self::VideoUnavailable => "Video or playlist unavailable",
            Self::PrivateVideo => "Private video or playlist",
            Self::AgeRestricted => "Age-restricted content",
            Self::GeoBlocked => "Geographic restriction",
            Self::RateLimited => "Rate limited by YouTube",
            Self::BotDetection => "Bot detection triggered",
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::NetworkTimeout => "Network timeout",
            Self::Unknown => "Extractor failed",
        }
    }
}

/// Analyze stderr output and return the failure reason
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    let lower = error.to_lowercase();

    if lower.contains("unsupported url")
        || lower.contains("is not a valid url")
        || lower.contains("incomplete youtube id")
        || lower.contains("invalid url")
    {
        return Some(BlockingReason::UnsupportedUrl);
    }

    if lower.contains("private video")
        || lower.contains("video is private")
        || lower.contains("playlist is private")
        || lower.contains("sign in if you've been granted access")
    {
        return Some(BlockingReason::PrivateVideo);
    }

    if lower.contains("video unavailable")
        || lower.contains("video is unavailable")
        || lower.contains("video has been removed")
        || lower.contains("this video is no longer available")
        || lower.contains("playlist does not exist")
        || lower.contains("the playlist does not exist")
        || lower.contains("this channel does not exist")
        || lower.contains("http error 404")
    {
        return Some(BlockingReason::VideoUnavailable);
    }

    if lower.contains("age-restricted")
        || lower.contains("sign in to confirm your age")
        || lower.contains("age_verification")
    {
        return Some(BlockingReason::AgeRestricted);
    }

    if lower.contains("not available in your country")
        || lower.contains("blocked in your country")
        || lower.contains("geo restricted")
    {
        return Some(BlockingReason::GeoBlocked);
    }

    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(BlockingReason::RateLimited);
    }

    if lower.contains("not a bot")
        || lower.contains("captcha")
        || lower.contains("unusual traffic")
    {
        return Some(BlockingReason::BotDetection);
    }

    if lower.contains("403") || lower.contains("forbidden") {
        return Some(BlockingReason::Http403Forbidden);
    }

    if lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection refused")
        || lower.contains("network is unreachable")
    {
        return Some(BlockingReason::NetworkTimeout);
    }

    if !error.trim().is_empty() {
        return Some(BlockingReason::Unknown);
    }

    None
}

/// Pick the most useful line out of a stderr dump
pub fn summarize(stderr: &str) -> String {
    const MAX_LEN: usize = 300;

    let line = stderr
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| stderr.lines().map(str::trim).filter(|l| !l.is_empty()).last())
        .unwrap_or("");

    line.chars().take(MAX_LEN).collect()
}
