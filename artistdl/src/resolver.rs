//! Track resolution: chart entries to catalog candidates.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::services::{CatalogClient, ChartClient};
use crate::types::TrackCandidate;

/// Outcome of resolving one artist request
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Chart entries considered; candidates may be fewer when the catalog
    /// had no match for an entry
    pub chart_entries: usize,
    /// Candidates in chart order, most popular first
    pub candidates: Vec<TrackCandidate>,
}

/// Turns an (artist, limit) request into an ordered candidate list
pub struct TrackResolver {
    chart: Arc<dyn ChartClient>,
    catalog: Arc<dyn CatalogClient>,
}

impl TrackResolver {
    pub fn new(chart: Arc<dyn ChartClient>, catalog: Arc<dyn CatalogClient>) -> Self {
        Self { chart, catalog }
    }

    /// Resolve up to `limit` candidates for an artist.
    ///
    /// One catalog search per chart entry, top-ranked match only. Entries
    /// without a catalog match are dropped silently, so the result may be
    /// shorter than `limit`. Input validation happens before any network
    /// interaction.
    pub async fn resolve(&self, artist: &str, limit: usize) -> Result<Resolution, ResolveError> {
        if artist.trim().is_empty() {
            return Err(ResolveError::InvalidArtist);
        }
        if limit == 0 {
            return Err(ResolveError::InvalidLimit);
        }

        let names = self.chart.top_tracks(artist, limit).await?;
        let chart_entries = names.len().min(limit);

        let mut candidates = Vec::with_capacity(chart_entries);
        for name in names.iter().take(limit) {
            match self.catalog.search_track(artist, name).await {
                Ok(Some(candidate)) => {
                    debug!(
                        track = %name,
                        catalog_id = %candidate.catalog_id,
                        "Resolved chart entry"
                    );
                    candidates.push(candidate);
                }
                Ok(None) => {
                    debug!(track = %name, "No catalog match, dropping chart entry");
                }
                // Per-entry search failures behave like a missing match:
                // the entry is dropped and the rest of the job continues.
                Err(e) => {
                    warn!(track = %name, error = %e, "Catalog search failed, dropping chart entry");
                }
            }
        }

        Ok(Resolution {
            chart_entries,
            candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{CatalogError, ChartError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeChart {
        tracks: Vec<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ChartClient for FakeChart {
        async fn top_tracks(&self, _artist: &str, limit: usize) -> Result<Vec<String>, ChartError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.tracks.iter().take(limit).map(|t| t.to_string()).collect())
        }
    }

    /// Matches every track except those listed as missing; "broken" tracks
    /// fail the search instead.
    struct FakeCatalog {
        missing: Vec<&'static str>,
        broken: Vec<&'static str>,
    }

    #[async_trait::async_trait]
    impl CatalogClient for FakeCatalog {
        async fn search_track(
            &self,
            _artist: &str,
            track: &str,
        ) -> Result<Option<TrackCandidate>, CatalogError> {
            if self.broken.contains(&track) {
                return Err(CatalogError::Network("connection reset".to_string()));
            }
            if self.missing.contains(&track) {
                return Ok(None);
            }
            Ok(Some(TrackCandidate {
                catalog_id: format!("id-{}", track),
                title: track.to_string(),
                artists: vec!["Artist".to_string()],
                album: None,
                duration: None,
                thumbnail_url: None,
            }))
        }
    }

    fn resolver(chart: FakeChart, catalog: FakeCatalog) -> TrackResolver {
        TrackResolver::new(Arc::new(chart), Arc::new(catalog))
    }

    #[tokio::test]
    async fn empty_artist_rejected_before_any_lookup() {
        let chart = Arc::new(FakeChart { tracks: vec!["One"], calls: AtomicUsize::new(0) });
        let r = TrackResolver::new(
            chart.clone(),
            Arc::new(FakeCatalog { missing: vec![], broken: vec![] }),
        );

        let result = r.resolve("   ", 5).await;
        assert!(matches!(result, Err(ResolveError::InvalidArtist)));
        assert_eq!(chart.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_limit_rejected_before_any_lookup() {
        let r = resolver(
            FakeChart { tracks: vec!["One"], calls: AtomicUsize::new(0) },
            FakeCatalog { missing: vec![], broken: vec![] },
        );

        assert!(matches!(r.resolve("Artist", 0).await, Err(ResolveError::InvalidLimit)));
    }

    #[tokio::test]
    async fn preserves_chart_order() {
        let r = resolver(
            FakeChart { tracks: vec!["One", "Two", "Three"], calls: AtomicUsize::new(0) },
            FakeCatalog { missing: vec![], broken: vec![] },
        );

        let resolution = r.resolve("Artist", 10).await.unwrap();
        assert_eq!(resolution.chart_entries, 3);
        let titles: Vec<&str> = resolution.candidates.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
    }

    #[tokio::test]
    async fn unmatched_entries_dropped_silently() {
        let r = resolver(
            FakeChart { tracks: vec!["One", "Two", "Three"], calls: AtomicUsize::new(0) },
            FakeCatalog { missing: vec!["Two"], broken: vec![] },
        );

        let resolution = r.resolve("Artist", 10).await.unwrap();
        assert_eq!(resolution.chart_entries, 3);
        assert_eq!(resolution.candidates.len(), 2);
    }

    #[tokio::test]
    async fn search_failures_drop_the_entry_not_the_job() {
        let r = resolver(
            FakeChart { tracks: vec!["One", "Two", "Three"], calls: AtomicUsize::new(0) },
            FakeCatalog { missing: vec![], broken: vec!["One"] },
        );

        let resolution = r.resolve("Artist", 10).await.unwrap();
        assert_eq!(resolution.candidates.len(), 2);
        assert_eq!(resolution.candidates[0].title, "Two");
    }

    #[tokio::test]
    async fn result_bounded_by_limit() {
        let r = resolver(
            FakeChart { tracks: vec!["One", "Two", "Three", "Four"], calls: AtomicUsize::new(0) },
            FakeCatalog { missing: vec![], broken: vec![] },
        );

        let resolution = r.resolve("Artist", 2).await.unwrap();
        assert_eq!(resolution.chart_entries, 2);
        assert_eq!(resolution.candidates.len(), 2);
    }

    #[tokio::test]
    async fn chart_failure_propagates() {
        struct DownChart;

        #[async_trait::async_trait]
        impl ChartClient for DownChart {
            async fn top_tracks(&self, artist: &str, _limit: usize) -> Result<Vec<String>, ChartError> {
                Err(ChartError::NotFound(artist.to_string()))
            }
        }

        let r = TrackResolver::new(
            Arc::new(DownChart),
            Arc::new(FakeCatalog { missing: vec![], broken: vec![] }),
        );

        assert!(matches!(r.resolve("Artist", 5).await, Err(ResolveError::Chart(_))));
    }
}
