//! Flat-file detection-history store.
//!
//! One JSON document holds the ordered list of all detection events.
//! Every operation loads or rewrites the whole document — O(n) per write,
//! acceptable for a single-operator upload workflow.
//!
//! Read-side policy is fail-open: a missing store is initialised empty, a
//! corrupt or unreadable store is treated as empty (with a warning) so the
//! application never blocks on a bad file. Write failures propagate.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use biowatch_common::event::DetectionEvent;

/// Handle to the on-disk history log. Stateless between calls; the file is
/// the only state.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        HistoryStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the full log in storage order.
    ///
    /// A store that has never been written is initialised to an empty log.
    /// An unreadable or structurally invalid store yields an empty log
    /// rather than an error; the raw file is left untouched so a later
    /// append rewrites it.
    pub fn load(&self) -> Vec<DetectionEvent> {
        if !self.path.exists() {
            if let Err(e) = self.write_log(&[]) {
                warn!("Cannot initialise history store {}: {e:#}", self.path.display());
            }
            return Vec::new();
        }

        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) => {
                warn!("Cannot read history store {}: {e}", self.path.display());
                return Vec::new();
            }
        };

        match serde_json::from_str(&text) {
            Ok(events) => events,
            Err(e) => {
                warn!("History store {} is corrupt, treating as empty: {e}", self.path.display());
                Vec::new()
            }
        }
    }

    /// Append `events` (in input order) to the end of the log and persist.
    pub fn append(&self, events: &[DetectionEvent]) -> Result<()> {
        let mut log = self.load();
        log.extend_from_slice(events);
        self.write_log(&log)
    }

    /// Replace the log with an empty one. Returns whether it succeeded.
    pub fn clear(&self) -> bool {
        match self.write_log(&[]) {
            Ok(()) => true,
            Err(e) => {
                warn!("Cannot clear history store {}: {e:#}", self.path.display());
                false
            }
        }
    }

    /// Atomic whole-log rewrite: write a sibling temp file, then rename.
    fn write_log(&self, events: &[DetectionEvent]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Cannot create data directory: {}", parent.display())
                })?;
            }
        }

        let json = serde_json::to_string_pretty(events)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Cannot write history store: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Cannot replace history store: {}", self.path.display()))?;
        Ok(())
    }
}

// ─── tests ───────────────────────────────────────────────────────────────
