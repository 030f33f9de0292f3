// Extractor tool status for the health endpoint

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::extractor::MetadataSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Reports on the metadata source. The version is fetched once, on first use.
pub struct ToolStatus {
    source: Arc<dyn MetadataSource>,
    version: OnceCell<Option<String>>,
}

impl ToolStatus {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self {
            source,
            version: OnceCell::new(),
        }
    }

    pub async fn info(&self) -> ToolInfo {
        let available = self.source.is_available();
        let version = if available {
            self.version
                .get_or_init(|| async {
                    let version = self.source.version().await;
                    if version.is_none() {
                        tracing::warn!(source = self.source.name(), "could not read extractor version");
                    }
                    version
                })
                .await
                .clone()
        } else {
            None
        };

        ToolInfo {
            name: self.source.name().to_string(),
            available,
            version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ExtractionError;
    use crate::models::{Batch, Listing};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingSource {
        available: bool,
        version_calls: AtomicUsize,
    }

    #[async_trait]
    impl MetadataSource for CountingSource {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn version(&self) -> Option<String> {
            self.version_calls.fetch_add(1, Ordering::SeqCst);
            Some("2025.01.15".to_string())
        }

        async fn extract(&self, _url: &str, _timeout: Duration) -> Result<Listing, ExtractionError> {
            Ok(Listing::default())
        }

        async fn extract_batch(
            &self,
            _urls: &[String],
            _timeout: Duration,
        ) -> Result<Batch, ExtractionError> {
            Ok(Batch::default())
        }
    }

    #[tokio::test]
    async fn test_version_fetched_once() {
        let source = Arc::new(CountingSource {
            available: true,
            version_calls: AtomicUsize::new(0),
        });
        let status = ToolStatus::new(source.clone());

        let first = status.info().await;
        let second = status.info().await;
        assert_eq!(first, second);
        assert_eq!(first.version.as_deref(), Some("2025.01.15"));
        assert_eq!(source.version_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unavailable_tool_has_no_version() {
        let source = Arc::new(CountingSource {
            available: false,
            version_calls: AtomicUsize::new(0),
        });
        let info = ToolStatus::new(source.clone()).info().await;
        assert!(!info.available);
        assert_eq!(info.version, None);
        assert_eq!(source.version_calls.load(Ordering::SeqCst), 0);

        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("version").is_none());
        assert_eq!(json["name"], "counting");
    }
}
