//! Job queue orchestration.
//!
//! Owns the artist job queue and runs exactly one worker task across all
//! queued jobs. Enqueue calls arrive concurrently from request-handling
//! contexts; the worker drains the queue FIFO, one collaborator call at a
//! time, so fetches never interleave and the ledger's check-then-append is
//! atomic within the worker. The queue, the in-flight job and the
//! worker-active flag live behind one mutex, which is never held across a
//! collaborator await.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ResolveError;
use crate::ledger::{LedgerEntry, PersistentLedger};
use crate::pipeline::FetchPipeline;
use crate::resolver::TrackResolver;
use crate::types::{ArtistJob, JobStatus};

struct QueueState {
    queue: VecDeque<ArtistJob>,
    worker_active: bool,
    /// Final snapshot of the most recently finished job
    last_completed: Option<ArtistJob>,
}

struct Inner {
    state: Mutex<QueueState>,
    resolver: TrackResolver,
    pipeline: FetchPipeline,
    ledger: RwLock<PersistentLedger>,
    /// Signalled whenever the worker goes idle
    idle: Notify,
}

/// Single-worker download queue
///
/// Cloneable handle; all clones share the same queue and ledger.
#[derive(Clone)]
pub struct QueueOrchestrator {
    inner: Arc<Inner>,
}

impl QueueOrchestrator {
    pub fn new(resolver: TrackResolver, pipeline: FetchPipeline, ledger: PersistentLedger) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState {
                    queue: VecDeque::new(),
                    worker_active: false,
                    last_completed: None,
                }),
                resolver,
                pipeline,
                ledger: RwLock::new(ledger),
                idle: Notify::new(),
            }),
        }
    }

    /// Append a job to the queue and make sure a worker is running.
    ///
    /// Invalid input is rejected before the job is queued. While a worker
    /// is active this only appends; the append and the start decision
    /// happen under one lock so concurrent enqueues can never spawn a
    /// second worker.
    pub async fn enqueue(&self, artist: &str, limit: usize) -> Result<Uuid, ResolveError> {
        let artist = artist.trim();
        if artist.is_empty() {
            return Err(ResolveError::InvalidArtist);
        }
        if limit == 0 {
            return Err(ResolveError::InvalidLimit);
        }

        let job = ArtistJob::new(artist.to_string(), limit);
        let job_id = job.job_id;

        let start_worker = {
            let mut state = self.inner.state.lock().await;
            state.queue.push_back(job);
            if state.worker_active {
                false
            } else {
                state.worker_active = true;
                true
            }
        };

        info!(job_id = %job_id, artist = %artist, limit = limit, "Artist job enqueued");

        if start_worker {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                inner.run_worker().await;
            });
        }

        Ok(job_id)
    }

    /// Ordered snapshot of the queue: the in-flight job first, then the
    /// still-pending jobs in FIFO order
    pub async fn queue_snapshot(&self) -> Vec<ArtistJob> {
        let state = self.inner.state.lock().await;
        state.queue.iter().cloned().collect()
    }

    /// Live snapshot of the in-flight job, or None when the worker is idle
    pub async fn current_job(&self) -> Option<ArtistJob> {
        let state = self.inner.state.lock().await;
        if !state.worker_active {
            return None;
        }
        state.queue.front().cloned()
    }

    /// Final stats snapshot of the most recently finished job, if any
    pub async fn last_completed(&self) -> Option<ArtistJob> {
        let state = self.inner.state.lock().await;
        state.last_completed.clone()
    }

    /// Ledger entries sorted by track title
    pub async fn ledger_snapshot(&self) -> Vec<LedgerEntry> {
        self.inner.ledger.read().await.snapshot()
    }

    /// Block until the queue is empty and the worker has stopped
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            {
                let state = self.inner.state.lock().await;
                if !state.worker_active && state.queue.is_empty() {
                    return;
                }
            }
            notified.await;
        }
    }
}

impl Inner {
    /// Worker loop: drain the queue FIFO, then deactivate. A later enqueue
    /// spawns a fresh worker.
    async fn run_worker(self: Arc<Self>) {
        debug!("Worker started");

        loop {
            // Claim the head job; only its identity leaves the lock.
            let claimed = {
                let mut state = self.state.lock().await;
                match state.queue.front_mut() {
                    Some(job) => {
                        job.status = JobStatus::Downloading;
                        Some((job.job_id, job.artist.clone(), job.limit))
                    }
                    None => {
                        state.worker_active = false;
                        None
                    }
                }
            };

            let Some((job_id, artist, limit)) = claimed else {
                break;
            };

            self.run_job(job_id, &artist, limit).await;

            {
                let mut state = self.state.lock().await;
                state.last_completed = state.queue.pop_front();
            }
        }

        debug!("Worker idle");
        self.idle.notify_waiters();
    }

    /// Process one job to completion. Never fails: every error kind has a
    /// continue-or-skip policy, and the job always reaches 100%.
    async fn run_job(&self, job_id: Uuid, artist: &str, limit: usize) {
        info!(job_id = %job_id, artist = %artist, limit = limit, "Starting artist job");

        let resolution = match self.resolver.resolve(artist, limit).await {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!(
                    job_id = %job_id,
                    artist = %artist,
                    error = %e,
                    "Track resolution failed; completing job with no candidates"
                );
                self.update_head_job(|job| {
                    job.progress = 100;
                    job.status = JobStatus::Done;
                })
                .await;
                return;
            }
        };

        let total = resolution.candidates.len();
        self.update_head_job(|job| {
            job.stats.total = resolution.chart_entries;
            job.stats.found = total;
            if total == 0 {
                job.progress = 100;
                job.status = JobStatus::Done;
            }
        })
        .await;

        if total == 0 {
            info!(job_id = %job_id, artist = %artist, "No candidates resolved");
            return;
        }

        let mut downloaded = 0usize;
        let mut failed = 0usize;

        for (index, candidate) in resolution.candidates.iter().enumerate() {
            let already_recorded = self.ledger.read().await.contains(&candidate.catalog_id);

            if already_recorded {
                debug!(
                    job_id = %job_id,
                    catalog_id = %candidate.catalog_id,
                    title = %candidate.title,
                    "Skipping already-downloaded track"
                );
            } else {
                match self.pipeline.process(candidate, artist).await {
                    Ok(_fetched) => {
                        downloaded += 1;
                        let entry = LedgerEntry::new(
                            candidate.catalog_id.clone(),
                            candidate.primary_artist(artist).to_string(),
                            candidate.title.clone(),
                        );
                        // A failed append leaves the track counted as
                        // downloaded; the accepted risk is a re-download
                        // on a later run, never a corrupted ledger.
                        if let Err(e) = self.ledger.write().await.append(entry) {
                            warn!(
                                job_id = %job_id,
                                catalog_id = %candidate.catalog_id,
                                error = %e,
                                "Ledger append failed; dedup not recorded for this track"
                            );
                        }
                    }
                    Err(e) => {
                        failed += 1;
                        warn!(
                            job_id = %job_id,
                            catalog_id = %candidate.catalog_id,
                            title = %candidate.title,
                            error = %e,
                            "Track fetch failed"
                        );
                    }
                }
            }

            // Skipped duplicates advance the index too.
            let processed = index + 1;
            self.update_head_job(|job| {
                job.stats.downloaded = downloaded;
                job.stats.failed = failed;
                job.progress = ((processed * 100) / total) as u8;
                if processed == total {
                    job.status = JobStatus::Done;
                }
            })
            .await;
        }

        info!(
            job_id = %job_id,
            artist = %artist,
            total = resolution.chart_entries,
            found = total,
            downloaded = downloaded,
            failed = failed,
            "Artist job completed"
        );
    }

    /// Apply a mutation to the in-flight (head) job. Only the worker
    /// removes jobs, so the head stays stable for the duration of run_job.
    async fn update_head_job<F: FnOnce(&mut ArtistJob)>(&self, mutate: F) {
        let mut state = self.state.lock().await;
        if let Some(job) = state.queue.front_mut() {
            mutate(job);
        }
    }
}
