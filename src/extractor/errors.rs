// Error types for metadata extraction

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::diagnostics::{diagnose_error, summarize, BlockingReason};

/// Failure category shared by extraction and resolution errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// User input is not a usable video/playlist reference
    InvalidUrl,
    /// The external tool exited abnormally or could not be started
    ProcessFailure,
    /// The external tool exceeded its deadline before producing output
    Timeout,
    /// Nothing resolvable at the given URL
    EmptyResult,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid-url",
            Self::ProcessFailure => "process-failure",
            Self::Timeout => "timeout",
            Self::EmptyResult => "empty-result",
        }
    }

    /// Whether the client may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProcessFailure | Self::Timeout)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    /// URL not recognised as a video or playlist
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Extractor exited abnormally with no usable output
    #[error("Extractor failed: {0}")]
    ProcessFailure(String),

    /// Deadline elapsed before any output was produced
    #[error("Extractor timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Clean run that produced nothing usable
    #[error("Nothing found: {0}")]
    EmptyResult(String),
}

impl ExtractionError {
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::InvalidUrl(_) => FailureReason::InvalidUrl,
            Self::ProcessFailure(_) => FailureReason::ProcessFailure,
            Self::Timeout(_) => FailureReason::Timeout,
            Self::EmptyResult(_) => FailureReason::EmptyResult,
        }
    }

    /// Classify a failed run from what the tool printed on stderr.
    pub fn from_stderr(stderr: &str) -> Self {
        let summary = summarize(stderr);
        let Some(reason) = diagnose_error(stderr) else {
            return Self::ProcessFailure("exited without output".to_string());
        };

        let detail = if summary.is_empty() {
            reason.description().to_string()
        } else {
            format!("{}: {}", reason.description(), summary)
        };

        match reason.failure_reason() {
            FailureReason::InvalidUrl => Self::InvalidUrl(detail),
            FailureReason::EmptyResult => Self::EmptyResult(detail),
            FailureReason::Timeout | FailureReason::ProcessFailure => {
                if reason == BlockingReason::Unknown {
                    Self::ProcessFailure(summary)
                } else {
                    Self::ProcessFailure(detail)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_strings() {
        assert_eq!(FailureReason::InvalidUrl.as_str(), "invalid-url");
        assert_eq!(
            serde_json::to_string(&FailureReason::EmptyResult).unwrap(),
            "\"empty-result\""
        );
        assert!(FailureReason::Timeout.is_retryable());
        assert!(!FailureReason::InvalidUrl.is_retryable());
    }

    #[test]
    fn test_from_stderr_classification() {
        let err = ExtractionError::from_stderr("ERROR: Unsupported URL: https://example.com");
        assert_eq!(err.reason(), FailureReason::InvalidUrl);

        let err = ExtractionError::from_stderr("ERROR: [youtube] x: Video unavailable");
        assert_eq!(err.reason(), FailureReason::EmptyResult);

        let err = ExtractionError::from_stderr("Traceback (most recent call last):\nKeyError: 'x'");
        assert_eq!(err.reason(), FailureReason::ProcessFailure);
        assert!(err.to_string().contains("KeyError"));

        let err = ExtractionError::from_stderr("");
        assert_eq!(err.reason(), FailureReason::ProcessFailure);
    }

    #[test]
    fn test_timeout_display() {
        let err = ExtractionError::Timeout(Duration::from_secs(45));
        assert_eq!(err.to_string(), "Extractor timed out after 45s");
    }
}
