//! Per-candidate fetch pipeline.
//!
//! For one resolved candidate: acquire the audio through the fetch tool,
//! then apply metadata tags. The caller decides what to skip; this
//! component is never handed a candidate the ledger already contains.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::services::{AudioFetcher, FetchError, TagRequest, TagWriter};
use crate::types::{FetchResult, TrackCandidate};

/// Fetch-and-tag pipeline for resolved candidates
pub struct FetchPipeline {
    fetcher: Arc<dyn AudioFetcher>,
    tagger: Arc<dyn TagWriter>,
    download_root: PathBuf,
}

impl FetchPipeline {
    pub fn new(
        fetcher: Arc<dyn AudioFetcher>,
        tagger: Arc<dyn TagWriter>,
        download_root: PathBuf,
    ) -> Self {
        Self {
            fetcher,
            tagger,
            download_root,
        }
    }

    /// Fetch one candidate into the primary artist's subdirectory and tag
    /// the result.
    ///
    /// `fallback_artist` is the originally-requested artist name, used when
    /// the candidate carries no contributing artists. A tag-write failure
    /// is logged but does not invalidate the fetch; the file still counts
    /// as downloaded.
    pub async fn process(
        &self,
        candidate: &TrackCandidate,
        fallback_artist: &str,
    ) -> Result<FetchResult, FetchError> {
        let primary_artist = candidate.primary_artist(fallback_artist);
        let dest_dir = self.download_root.join(dir_name(primary_artist));
        std::fs::create_dir_all(&dest_dir)?;

        let fetched = self.fetcher.fetch(&candidate.catalog_id, &dest_dir).await?;

        info!(
            catalog_id = %candidate.catalog_id,
            title = %candidate.title,
            artist = %primary_artist,
            file = %fetched.file_path.display(),
            "Track downloaded"
        );

        let request = TagRequest {
            file_path: fetched.file_path.clone(),
            artist: primary_artist.to_string(),
            title: candidate.title.clone(),
            album: candidate.album.clone().or_else(|| fetched.album.clone()),
            year: fetched.release_year,
            artwork_url: candidate
                .thumbnail_url
                .clone()
                .or_else(|| fetched.thumbnail_url.clone()),
        };

        if let Err(e) = self.tagger.write_tags(&request).await {
            warn!(
                file = %fetched.file_path.display(),
                error = %e,
                "Tag write failed; keeping download"
            );
        }

        Ok(fetched)
    }
}

/// Artist names become directory names; strip the characters that would
/// escape or break the path.
fn dir_name(artist: &str) -> String {
    let cleaned: String = artist
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            other => other,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}
