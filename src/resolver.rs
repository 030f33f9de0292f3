// Playlist Resolver - listing, chunked deep extraction and result assembly
//
// Flow for one request:
// 1. classify the URL; single-video links skip chunking
// 2. one flattened listing for everything else
// 3. cut to `max_items`, split into chunks of `chunk_size`
// 4. run chunks one after another, each bounded by the chunk timeout and
//    whatever is left of the request budget
//
// Progress is carried through the chunk loop as a plain value. Nothing here
// is shared between requests except the source and the config.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::extractor::{ExtractionError, FailureReason, MetadataSource};
use crate::links::{self, LinkKind};
use crate::models::{Listing, PlaylistKind, PlaylistResult, VideoRecord};
use crate::normalizer::{normalize, NormalizeOptions};

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Hard upper bound on videos per result
    pub max_playlist_size: usize,
    /// Videos per extractor invocation
    pub chunk_size: usize,
    pub chunk_timeout: Duration,
    pub listing_timeout: Duration,
    /// Cumulative budget for all chunks of one request
    pub request_budget: Duration,
    pub normalize: NormalizeOptions,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_playlist_size: 200,
            chunk_size: 25,
            chunk_timeout: Duration::from_secs(45),
            listing_timeout: Duration::from_secs(60),
            request_budget: Duration::from_secs(240),
            normalize: NormalizeOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("No playable videos found at {url}")]
    NothingResolved { url: String },
}

impl ResolutionError {
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::Extraction(e) => e.reason(),
            Self::NothingResolved { .. } => FailureReason::EmptyResult,
        }
    }
}

/// A listing entry scheduled for deep extraction
#[derive(Debug, Clone)]
struct Entry {
    id: String,
    url: String,
}

/// Accumulated state of the chunk loop
#[derive(Debug, Default)]
struct Progress {
    videos: Vec<VideoRecord>,
    truncated: bool,
}

/// What one chunk contributed
struct ChunkOutcome {
    videos: Vec<VideoRecord>,
    timed_out: bool,
    error: Option<ExtractionError>,
}

impl Progress {
    fn absorb(mut self, outcome: ChunkOutcome) -> Self {
        self.truncated |= outcome.timed_out || outcome.error.is_some();
        self.videos.extend(outcome.videos);
        self
    }

    fn mark_truncated(mut self) -> Self {
        self.truncated = true;
        self
    }
}

pub struct PlaylistResolver {
    source: Arc<dyn MetadataSource>,
    config: ResolverConfig,
}

impl PlaylistResolver {
    pub fn new(source: Arc<dyn MetadataSource>, config: ResolverConfig) -> Self {
        Self { source, config }
    }

    /// Effective item limit for a request
    pub fn clamp_max_items(&self, requested: Option<usize>) -> usize {
        let ceiling = self.config.max_playlist_size.max(1);
        requested.unwrap_or(ceiling).clamp(1, ceiling)
    }

    pub async fn resolve(
        &self,
        url: &str,
        max_items: Option<usize>,
    ) -> Result<PlaylistResult, ResolutionError> {
        let limit = self.clamp_max_items(max_items);
        let link = links::classify_str(url);
        tracing::info!(url, ?link, limit, source = self.source.name(), "resolving");

        if link == LinkKind::Other {
            return Err(ExtractionError::InvalidUrl(format!(
                "not a YouTube video, playlist or channel: {}",
                url
            ))
            .into());
        }

        let listing = self.source.extract(url, self.config.listing_timeout).await?;

        if link.is_single_video()
            || listing.single_fallback
            || (listing.items.len() == 1 && listing.title.is_none())
        {
            return self.single(url, listing);
        }

        self.playlist(url, listing, limit).await
    }

    fn single(&self, url: &str, listing: Listing) -> Result<PlaylistResult, ResolutionError> {
        let video = listing
            .items
            .iter()
            .find_map(|item| normalize(item, &self.config.normalize))
            .ok_or_else(|| ResolutionError::NothingResolved {
                url: url.to_string(),
            })?;

        Ok(PlaylistResult {
            kind: PlaylistKind::Single,
            title: Some(video.title.clone()).filter(|t| !t.is_empty()),
            videos: vec![video],
            requested_url: url.to_string(),
            truncated: false,
        })
    }

    async fn playlist(
        &self,
        url: &str,
        listing: Listing,
        limit: usize,
    ) -> Result<PlaylistResult, ResolutionError> {
        let mut entries: Vec<Entry> = listing
            .items
            .iter()
            .filter_map(|item| normalize(item, &self.config.normalize))
            .map(|flat| Entry {
                url: links::watch_url(&flat.id),
                id: flat.id,
            })
            .collect();

        // First position wins
        let listed = entries.len();
        let mut seen = HashSet::new();
        entries.retain(|e| seen.insert(e.id.clone()));
        if entries.len() < listed {
            tracing::debug!(
                url,
                repeated = listed - entries.len(),
                "listing repeats video ids, keeping first occurrence"
            );
        }

        let mut truncated = !listing.complete;
        if !listing.complete {
            tracing::warn!(url, entries = entries.len(), "listing incomplete, result will be truncated");
        }

        let entries = if entries.len() > limit {
            truncated = true;
            entries.into_iter().take(limit).collect::<Vec<_>>()
        } else {
            entries
        };

        if entries.is_empty() {
            return Err(ResolutionError::NothingResolved {
                url: url.to_string(),
            });
        }

        let chunk_size = self.config.chunk_size.max(1);
        let chunk_count = entries.len().div_ceil(chunk_size);
        let budget_ends = Instant::now() + self.config.request_budget;

        let mut progress = Progress {
            truncated,
            ..Progress::default()
        };

        for (index, chunk) in entries.chunks(chunk_size).enumerate() {
            let remaining = budget_ends.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(
                    url,
                    skipped = chunk_count - index,
                    "request budget exhausted, skipping remaining chunks"
                );
                progress = progress.mark_truncated();
                break;
            }

            let timeout = self.config.chunk_timeout.min(remaining);
            let outcome = self.run_chunk(index, chunk, timeout).await;

            if index == 0 && outcome.videos.is_empty() {
                return Err(match outcome.error {
                    Some(e) => ResolutionError::Extraction(e),
                    None => ResolutionError::NothingResolved {
                        url: url.to_string(),
                    },
                });
            }

            progress = progress.absorb(outcome);
        }

        tracing::info!(
            url,
            videos = progress.videos.len(),
            truncated = progress.truncated,
            "playlist resolved"
        );

        Ok(PlaylistResult {
            kind: PlaylistKind::Playlist,
            title: listing.title,
            videos: progress.videos,
            requested_url: url.to_string(),
            truncated: progress.truncated,
        })
    }

    /// Deep-extract one chunk and put the results back in listing order
    async fn run_chunk(&self, index: usize, chunk: &[Entry], timeout: Duration) -> ChunkOutcome {
        let urls: Vec<String> = chunk.iter().map(|e| e.url.clone()).collect();
        let started = Instant::now();

        let batch = match self.source.extract_batch(&urls, timeout).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(chunk = index, size = chunk.len(), error = %e, "chunk failed");
                let timed_out = e.reason() == FailureReason::Timeout;
                return ChunkOutcome {
                    videos: Vec::new(),
                    timed_out,
                    error: Some(e),
                };
            }
        };

        let mut resolved: HashMap<String, VideoRecord> = batch
            .items
            .iter()
            .filter_map(|item| normalize(item, &self.config.normalize))
            .map(|video| (video.id.clone(), video))
            .collect();

        let videos: Vec<VideoRecord> = chunk
            .iter()
            .filter_map(|entry| resolved.remove(&entry.id))
            .collect();

        let dropped = chunk.len() - videos.len();
        if batch.timed_out {
            tracing::warn!(
                chunk = index,
                resolved = videos.len(),
                size = chunk.len(),
                "chunk timed out, keeping partial results"
            );
        } else if dropped > 0 {
            tracing::debug!(chunk = index, dropped, "items missing from chunk output");
        }
        tracing::debug!(
            chunk = index,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chunk finished"
        );

        ChunkOutcome {
            videos,
            timed_out: batch.timed_out,
            error: None,
        }
    }
}
