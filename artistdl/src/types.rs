//! Core data types shared across the download pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Queue lifecycle of an artist job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    /// Waiting behind earlier jobs
    Queued,
    /// Being drained by the worker
    Downloading,
    /// All candidates processed; about to leave the queue
    Done,
}

/// Per-job counters surfaced in progress snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadStats {
    /// Chart entries considered for this job
    pub total: usize,
    /// Chart entries with a catalog match
    pub found: usize,
    /// Tracks fetched successfully
    pub downloaded: usize,
    /// Tracks whose fetch failed
    pub failed: usize,
}

/// One queued artist request plus its live progress
///
/// Created on enqueue, mutated only by the worker, removed from the queue
/// when the job completes. History persists independently in the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct ArtistJob {
    /// Identifier for log correlation across the job's lifetime
    pub job_id: Uuid,
    pub artist: String,
    /// Maximum number of tracks to resolve
    pub limit: usize,
    pub status: JobStatus,
    /// Percentage complete, 0-100, non-decreasing while downloading
    pub progress: u8,
    pub stats: DownloadStats,
    pub enqueued_at: DateTime<Utc>,
}

impl ArtistJob {
    pub fn new(artist: String, limit: usize) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            artist,
            limit,
            status: JobStatus::Queued,
            progress: 0,
            stats: DownloadStats::default(),
            enqueued_at: Utc::now(),
        }
    }
}

/// A chart entry resolved to its top-ranked catalog match, not yet fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackCandidate {
    /// Opaque catalog identifier, the dedup key
    pub catalog_id: String,
    pub title: String,
    /// Contributing artists in catalog order; may be empty for some matches
    pub artists: Vec<String>,
    pub album: Option<String>,
    /// Display duration as reported by the catalog, e.g. "3:45"
    pub duration: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl TrackCandidate {
    /// First contributing artist, or `fallback` when the catalog returned none
    pub fn primary_artist<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.artists
            .first()
            .map(String::as_str)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(fallback)
    }
}

/// Outcome of a successful fetch, handed to the tag writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// Final local path of the extracted audio file
    pub file_path: PathBuf,
    pub album: Option<String>,
    pub release_year: Option<i32>,
    pub thumbnail_url: Option<String>,
}
