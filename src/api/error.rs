use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::extractor::FailureReason;
use crate::resolver::ResolutionError;

/// Request-level error returned by the HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body or parameters unusable
    #[error("{0}")]
    BadRequest(String),

    /// `url` is not an absolute http(s) URL
    #[error("{0}")]
    InvalidUrl(String),

    /// Body could not be read or decoded as JSON
    #[error("{message}")]
    InvalidBody { status: StatusCode, message: String },

    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        ApiError::InvalidBody {
            status,
            message: rejection.body_text(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// JSON error body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    reason: &'static str,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

fn status_for(reason: FailureReason) -> StatusCode {
    match reason {
        FailureReason::InvalidUrl => StatusCode::BAD_REQUEST,
        FailureReason::EmptyResult => StatusCode::NOT_FOUND,
        FailureReason::Timeout => StatusCode::GATEWAY_TIMEOUT,
        FailureReason::ProcessFailure => StatusCode::BAD_GATEWAY,
    }
}

fn message_for(reason: FailureReason) -> &'static str {
    match reason {
        FailureReason::InvalidUrl => "URL is not a video or playlist",
        FailureReason::EmptyResult => "No videos found",
        FailureReason::Timeout => "Extraction timed out, try again",
        FailureReason::ProcessFailure => "Extraction failed, try again",
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidBody { status, .. } => *status,
            ApiError::Resolution(e) => status_for(e.reason()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::BadRequest(msg) => ErrorResponse {
                error: msg.clone(),
                reason: "invalid-request",
                retryable: false,
                details: None,
            },
            ApiError::InvalidBody { message, .. } => ErrorResponse {
                error: message.clone(),
                reason: "invalid-request",
                retryable: false,
                details: None,
            },
            ApiError::InvalidUrl(msg) => ErrorResponse {
                error: msg.clone(),
                reason: FailureReason::InvalidUrl.as_str(),
                retryable: false,
                details: None,
            },
            ApiError::Resolution(e) => {
                let reason = e.reason();
                if reason == FailureReason::EmptyResult || reason == FailureReason::InvalidUrl {
                    tracing::info!(%reason, "Resolution rejected: {}", e);
                } else {
                    tracing::error!(%reason, "Resolution error: {}", e);
                }
                ErrorResponse {
                    error: message_for(reason).to_string(),
                    reason: reason.as_str(),
                    retryable: reason.is_retryable(),
                    details: Some(e.to_string()),
                }
            }
        };

        (status, Json(body)).into_response()
    }
}
