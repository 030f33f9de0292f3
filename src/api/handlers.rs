use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use url::Url;

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::models::PlaylistResult;
use crate::tools::ToolInfo;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistRequest {
    pub url: String,
    #[serde(default)]
    pub max_items: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub started_at: String,
    pub uptime_seconds: u64,
    pub extractor: ToolInfo,
}

/// Absolute http(s) URL with a host
fn validate_url(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ApiError::InvalidUrl(format!("Not a valid URL: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::InvalidUrl(format!(
            "Unsupported scheme '{}', expected http or https",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ApiError::InvalidUrl("URL has no host".to_string()));
    }

    Ok(url)
}

fn validate_max_items(max_items: Option<i64>) -> Result<Option<usize>, ApiError> {
    match max_items {
        None => Ok(None),
        Some(n) if n < 1 => Err(ApiError::BadRequest(format!(
            "maxItems must be at least 1, got {}",
            n
        ))),
        Some(n) => Ok(Some(usize::try_from(n).unwrap_or(usize::MAX))),
    }
}

/// POST /api/playlist
pub async fn resolve_playlist(
    State(state): State<AppState>,
    payload: Result<Json<PlaylistRequest>, JsonRejection>,
) -> ApiResult<Json<PlaylistResult>> {
    let Json(request) = payload?;

    validate_url(&request.url)?;
    let max_items = validate_max_items(request.max_items)?;

    let result = state
        .resolver
        .resolve(request.url.trim(), max_items)
        .await?;

    Ok(Json(result))
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let started_at = state
        .started_at
        .format(&Rfc3339)
        .unwrap_or_else(|_| state.started_at.unix_timestamp().to_string());

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        started_at,
        uptime_seconds: state.started.elapsed().as_secs(),
        extractor: state.tools.info().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::create_router;
    use crate::extractor::{ExtractionError, MetadataSource};
    use crate::models::{Batch, Listing, RawItem};
    use crate::resolver::ResolverConfig;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Answers by URL: `list=PL...` is a playlist of `n` entries, `v=` a single
    /// video, anything with `missing` is empty and `broken` fails.
    struct StubSource;

    fn raw(id: &str) -> RawItem {
        RawItem {
            id: Some(id.to_string()),
            title: Some(format!("Title {}", id)),
            duration: Some(30.0),
            ..Default::default()
        }
    }

    #[async_trait]
    impl MetadataSource for StubSource {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn version(&self) -> Option<String> {
            Some("test".to_string())
        }

        async fn extract(&self, url: &str, timeout: Duration) -> Result<Listing, ExtractionError> {
            if url.contains("broken") {
                return Err(ExtractionError::ProcessFailure("exit status 1".to_string()));
            }
            if url.contains("slow") {
                return Err(ExtractionError::Timeout(timeout));
            }
            if url.contains("missing") {
                return Err(ExtractionError::EmptyResult("nothing".to_string()));
            }
            if url.contains("list=PL") {
                return Ok(Listing {
                    title: Some("Fifty".to_string()),
                    items: (0..50).map(|i| raw(&format!("p{:02}", i))).collect(),
                    single_fallback: false,
                    complete: true,
                });
            }
            let id = url.rsplit("v=").next().unwrap_or_default();
            Ok(Listing {
                title: None,
                items: vec![raw(id)],
                single_fallback: false,
                complete: true,
            })
        }

        async fn extract_batch(
            &self,
            urls: &[String],
            _timeout: Duration,
        ) -> Result<Batch, ExtractionError> {
            Ok(Batch {
                items: urls
                    .iter()
                    .map(|u| raw(u.rsplit("v=").next().unwrap_or_default()))
                    .collect(),
                timed_out: false,
            })
        }
    }

    fn app() -> axum::Router {
        let state = AppState::new(Arc::new(StubSource), ResolverConfig::default());
        create_router(state, &[], 16 * 1024)
    }

    async fn post(body: &str) -> (StatusCode, serde_json::Value) {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/playlist")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_single_video_request() {
        let (status, json) = post(r#"{"url":"https://youtube.com/watch?v=abc123"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["kind"], "single");
        assert_eq!(json["videos"].as_array().unwrap().len(), 1);
        assert_eq!(json["videos"][0]["id"], "abc123");
        assert_eq!(json["truncated"], false);
    }

    #[tokio::test]
    async fn test_max_items_request() {
        let (status, json) = post(
            r#"{"url":"https://www.youtube.com/playlist?list=PLfifty","maxItems":20}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["kind"], "playlist");
        assert_eq!(json["videos"].as_array().unwrap().len(), 20);
        assert_eq!(json["truncated"], true);
        assert_eq!(json["requestedUrl"], "https://www.youtube.com/playlist?list=PLfifty");
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let (status, json) = post(r#"{"url":"not a url"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["reason"], "invalid-url");
        assert_eq!(json["retryable"], false);

        let (status, json) = post(r#"{"url":"ftp://youtube.com/playlist?list=PL1"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["reason"], "invalid-url");

        let (status, _) = post(r#"{"url":"https://www.youtube.com/playlist?list=PL1","maxItems":0}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = post(r#"{"link":"https://youtu.be/x"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["reason"], "invalid-request");
    }

    #[tokio::test]
    async fn test_rejects_non_youtube_url() {
        let (status, json) = post(r#"{"url":"https://example.com/watch?v=abc"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["reason"], "invalid-url");
        assert_eq!(json["retryable"], false);
    }

    #[tokio::test]
    async fn test_failure_reasons_map_to_status() {
        let (status, json) = post(r#"{"url":"https://www.youtube.com/watch?v=broken"}"#).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["reason"], "process-failure");
        assert_eq!(json["retryable"], true);

        let (status, json) = post(r#"{"url":"https://www.youtube.com/watch?v=slow"}"#).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(json["retryable"], true);

        let (status, json) = post(r#"{"url":"https://www.youtube.com/watch?v=missing"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["reason"], "empty-result");
        assert_eq!(json["retryable"], false);
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["extractor"]["name"], "stub");
        assert_eq!(json["extractor"]["available"], true);
        assert_eq!(json["extractor"]["version"], "test");
        assert!(json["startedAt"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_validate_max_items() {
        assert_eq!(validate_max_items(None).unwrap(), None);
        assert_eq!(validate_max_items(Some(5)).unwrap(), Some(5));
        assert!(validate_max_items(Some(0)).is_err());
        assert!(validate_max_items(Some(-3)).is_err());
    }
}
