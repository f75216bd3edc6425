//! External collaborator clients and their trait seams.
//!
//! The orchestrator is constructed against these traits so tests can inject
//! in-memory fakes; the concrete clients talk to Last.fm, YouTube Music,
//! the yt-dlp binary and the ID3 container.

pub mod catalog_client;
pub mod chart_client;
pub mod fetcher;
pub mod tagger;

pub use catalog_client::{CatalogError, YtMusicCatalog};
pub use chart_client::{ChartError, LastFmChart};
pub use fetcher::{FetchError, YtDlpFetcher};
pub use tagger::{Id3Tagger, TagError, TagRequest};

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::types::{FetchResult, TrackCandidate};

/// Chart lookup: ordered top-track names for an artist, most popular first
#[async_trait::async_trait]
pub trait ChartClient: Send + Sync {
    async fn top_tracks(&self, artist: &str, limit: usize) -> Result<Vec<String>, ChartError>;
}

/// Catalog search: the top-ranked match for a free-text query, if any
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    async fn search_track(
        &self,
        artist: &str,
        track: &str,
    ) -> Result<Option<TrackCandidate>, CatalogError>;
}

/// Audio acquisition for one catalog id into a destination directory
#[async_trait::async_trait]
pub trait AudioFetcher: Send + Sync {
    async fn fetch(&self, catalog_id: &str, dest_dir: &Path) -> Result<FetchResult, FetchError>;
}

/// In-place metadata container writer
#[async_trait::async_trait]
pub trait TagWriter: Send + Sync {
    async fn write_tags(&self, request: &TagRequest) -> Result<(), TagError>;
}

/// Minimum-interval rate limiter for the HTTP clients
pub(crate) struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub(crate) fn new(min_interval_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        })
    }

    /// Wait if necessary to comply with the rate limit
    pub(crate) async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rate_limiter_spaces_out_requests() {
        let limiter = RateLimiter::new(100);

        let start = Instant::now();
        limiter.wait().await;
        let first = start.elapsed();
        limiter.wait().await;
        let second = start.elapsed();

        assert!(first < Duration::from_millis(50));
        assert!(second >= Duration::from_millis(90));
    }
}
