//! Error taxonomy for the download core.
//!
//! Each failure kind carries an explicit policy, applied by the
//! orchestrator: invalid input is rejected before any I/O, a chart failure
//! completes the job with zero candidates, and per-candidate fetch, tag and
//! ledger failures are counted or logged without aborting the job. No error
//! here is fatal to the worker.

use thiserror::Error;

use crate::services::ChartError;

/// Errors surfaced while turning an artist request into track candidates
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Rejected before any network interaction
    #[error("artist name must not be empty")]
    InvalidArtist,

    /// Rejected before any network interaction
    #[error("requested track limit must be positive")]
    InvalidLimit,

    /// Chart collaborator unreachable or returned an unusable payload
    #[error("chart lookup failed: {0}")]
    Chart(#[from] ChartError),
}

/// Errors writing or reading the persistent dedup ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}
