//! Persistent dedup ledger.
//!
//! Durable record of every track processed so far, keyed by catalog id. The
//! backing store is a JSON-lines text file: one record per line, appended
//! and flushed to disk before `append` returns. Appending never rewrites
//! earlier lines, so a crash mid-write can corrupt at most the final line —
//! the worst case after a crash is a duplicate re-download, never a lost
//! store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::LedgerError;

/// One recorded download, keyed by catalog id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub catalog_id: String,
    pub artist: String,
    pub title: String,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        catalog_id: impl Into<String>,
        artist: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            catalog_id: catalog_id.into(),
            artist: artist.into(),
            title: title.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Durable source-of-truth for "already downloaded"
#[derive(Debug)]
pub struct PersistentLedger {
    path: PathBuf,
    entries: HashMap<String, LedgerEntry>,
}

impl PersistentLedger {
    /// Load the ledger from `path`.
    ///
    /// An absent, empty or unreadable file yields an empty ledger — startup
    /// never fails on ledger state. Individual malformed lines are skipped
    /// with a warning; later duplicates of an id are ignored.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut entries = HashMap::new();

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                for (line_no, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<LedgerEntry>(line) {
                        Ok(entry) => {
                            entries
                                .entry(entry.catalog_id.clone())
                                .or_insert(entry);
                        }
                        Err(e) => {
                            warn!(
                                path = %path.display(),
                                line = line_no + 1,
                                error = %e,
                                "Skipping malformed ledger line"
                            );
                        }
                    }
                }
                debug!(
                    path = %path.display(),
                    entries = entries.len(),
                    "Ledger loaded"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No ledger file yet, starting empty");
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Ledger unreadable, starting empty"
                );
            }
        }

        Self { path, entries }
    }

    /// True iff an entry with this catalog id has been recorded
    pub fn contains(&self, catalog_id: &str) -> bool {
        self.entries.contains_key(catalog_id)
    }

    /// Record one entry, durably flushed before returning.
    ///
    /// A duplicate id is a no-op success (uniqueness on catalog id). On a
    /// write failure the entry is not retained in memory either, so the
    /// caller observes it as "not recorded".
    pub fn append(&mut self, entry: LedgerEntry) -> Result<(), LedgerError> {
        if self.contains(&entry.catalog_id) {
            debug!(catalog_id = %entry.catalog_id, "Ledger already holds this id");
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.sync_all()?;

        self.entries.insert(entry.catalog_id.clone(), entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, sorted by track title for presentation
    pub fn snapshot(&self) -> Vec<LedgerEntry> {
        let mut entries: Vec<LedgerEntry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.catalog_id.cmp(&b.catalog_id)));
        entries
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
