//! Persistent Snapshot Store.
//!
//! Keeps the long-term texts on disk as a pretty-printed JSON array of
//! strings.  Vectors are never written: they are recomputed on load, so the
//! file does not depend on vocabulary size, hash width or embedding strategy.
//!
//! # File format
//!
//! ```json
//! [
//!   "the reactor is safe",
//!   "coolant flow is stable"
//! ]
//! ```
//!
//! Older snapshots stored `{ "text": ..., "vec": [...] }` objects instead of
//! bare strings.  Those still load; the stored vector is discarded and only
//! the text is kept.  The next save rewrites the file in the bare-string form.
//!
//! # Failure model
//!
//! [`SnapshotStore::load`] and [`SnapshotStore::save`] never fail.  A missing
//! or malformed file loads as an empty sequence, and a failed save is logged
//! and dropped; the in-memory state stays authoritative.  The fallible
//! versions, [`SnapshotStore::try_load`] and [`SnapshotStore::try_save`],
//! report a [`StoreError`] for callers that care.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise while reading or writing a snapshot.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed snapshot {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not encode snapshot for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// On-disk records
// ─────────────────────────────────────────────────────────────────────────────

/// One element of the snapshot array, in either accepted shape.
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotRecord {
    Text(String),
    Legacy { text: String },
}

impl SnapshotRecord {
    fn into_text(self) -> String {
        match self {
            SnapshotRecord::Text(text) | SnapshotRecord::Legacy { text } => text,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SnapshotStore
// ─────────────────────────────────────────────────────────────────────────────

/// Full-snapshot JSON persistence for the long-term texts at one path.
///
/// Only one writer per path is supported; callers must serialize access.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ordered texts from the snapshot; empty when absent or unreadable.
    pub fn load(&self) -> Vec<String> {
        match self.try_load() {
            Ok(texts) => texts,
            Err(e) => {
                warn!(error = %e, "discarding unreadable memory snapshot; starting empty");
                Vec::new()
            }
        }
    }

    /// Like [`load`][Self::load] but reports why the snapshot was rejected.
    ///
    /// A missing file is not an error and yields `Ok(vec![])`.
    pub fn try_load(&self) -> Result<Vec<String>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no memory snapshot found");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let records: Vec<SnapshotRecord> =
            serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        Ok(records.into_iter().map(SnapshotRecord::into_text).collect())
    }

    /// Overwrite the snapshot with `texts`.  Failures are logged, not raised.
    pub fn save(&self, texts: &[String]) {
        if let Err(e) = self.try_save(texts) {
            warn!(error = %e, "memory snapshot not saved; in-memory state is unaffected");
        }
    }

    /// Like [`save`][Self::save] but reports failures.
    ///
    /// Writes to a sibling temporary file first and renames it over the
    /// target, so a crash mid-write leaves the previous snapshot intact.
    pub fn try_save(&self, texts: &[String]) -> Result<(), StoreError> {
        let io_err = |source: io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let raw = serde_json::to_string_pretty(texts).map_err(|source| StoreError::Serialize {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.temp_path();
        fs::write(&tmp, raw).map_err(io_err)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(io_err(e));
        }
        debug!(path = %self.path.display(), entries = texts.len(), "memory snapshot saved");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
