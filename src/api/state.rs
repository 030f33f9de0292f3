use std::sync::Arc;
use std::time::Instant;
use time::OffsetDateTime;

use crate::extractor::MetadataSource;
use crate::resolver::{PlaylistResolver, ResolverConfig};
use crate::tools::ToolStatus;

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<PlaylistResolver>,
    pub tools: Arc<ToolStatus>,
    pub started_at: OffsetDateTime,
    pub started: Instant,
}

impl AppState {
    pub fn new(source: Arc<dyn MetadataSource>, config: ResolverConfig) -> Self {
        Self {
            resolver: Arc::new(PlaylistResolver::new(source.clone(), config)),
            tools: Arc::new(ToolStatus::new(source)),
            started_at: OffsetDateTime::now_utc(),
            started: Instant::now(),
        }
    }
}
