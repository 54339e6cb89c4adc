//! Memory Manager.
//!
//! The facade the rest of the agent talks to.  It owns a short-term buffer
//! of raw strings and a long-term store of embedded [`MemoryEntry`] values,
//! and wires the long-term side through a [`Vectorizer`], a
//! [`SimilarityIndex`] and a [`SnapshotStore`]:
//!
//! ```text
//! remember(item, long_term = true)
//!   └─ Vectorizer::embed ─► SimilarityIndex::add ─► SnapshotStore::save
//! query(text, k)
//!   └─ Vectorizer::embed_query ─► SimilarityIndex::search ─► texts
//! ```
//!
//! The index always holds exactly one vector per long-term entry, in the
//! same order.  When a backend refuses a new vector (the counting vocabulary
//! grew past the width a fixed-width backend was built for) the index is
//! rebuilt from the stored entries, zero-padded to the current width, before
//! `remember` returns.  If the backend refuses the rebuild as well, the
//! manager swaps it for a [`BruteForceIndex`], which accepts anything.
//!
//! None of the public operations return errors.
//!
//! # Example
//!
//! ```rust
//! use mnemos_memory::MemoryManager;
//! use mnemos_types::MemoryConfig;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut memory = MemoryManager::open(&MemoryConfig::at(dir.path().join("memory.json")));
//!
//! memory.remember("Thought: check the pumps", false);
//! memory.remember("the reactor is safe", true);
//! memory.remember("coolant flow is stable", true);
//!
//! let hits = memory.query("reactor safety", 1);
//! assert_eq!(hits[0].text, "the reactor is safe");
//! ```

use mnemos_types::{EmbeddingStrategy, IndexBackend, MemoryConfig, MemoryEntry, ScoredMemory};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::index::{BruteForceIndex, IndexError, SimilarityIndex, select_backend};
use crate::store::SnapshotStore;
use crate::vectorizer::{Vectorizer, build_vectorizer, pad_to};

/// Default `top_k` used by callers that have no preference.
pub const DEFAULT_TOP_K: usize = 3;

// ─────────────────────────────────────────────────────────────────────────────
// MemoryManager
// ─────────────────────────────────────────────────────────────────────────────

/// Short-term buffer plus persistent, searchable long-term memory.
pub struct MemoryManager {
    store: SnapshotStore,
    short_term: Vec<String>,
    long_term: Vec<MemoryEntry>,
    vectorizer: Box<dyn Vectorizer>,
    index: Box<dyn SimilarityIndex>,
}

impl std::fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("path", &self.store.path())
            .field("strategy", &self.vectorizer.strategy())
            .field("backend", &self.index.kind())
            .field("short_term", &self.short_term.len())
            .field("long_term", &self.long_term.len())
            .finish()
    }
}

impl MemoryManager {
    /// Build the vectorizer and index described by `config` and load the
    /// snapshot at `config.path`.
    pub fn open(config: &MemoryConfig) -> Self {
        let vectorizer = build_vectorizer(config);
        let index = select_backend(config, vectorizer.as_ref());
        Self::with_components(&config.path, vectorizer, index)
    }

    /// Assemble a manager from explicit parts and load the snapshot at `path`.
    ///
    /// Every stored text is embedded first, then `index` is cleared and
    /// filled once, padded to the final vocabulary width.
    pub fn with_components(
        path: impl Into<PathBuf>,
        vectorizer: Box<dyn Vectorizer>,
        index: Box<dyn SimilarityIndex>,
    ) -> Self {
        let mut manager = Self {
            store: SnapshotStore::new(path),
            short_term: Vec::new(),
            long_term: Vec::new(),
            vectorizer,
            index,
        };
        // Replaying texts in order rebuilds the vocabulary deterministically.
        for text in manager.store.load() {
            let vector = manager.vectorizer.embed(&text);
            manager.long_term.push(MemoryEntry::new(text, vector));
        }
        manager.rebuild_index();
        info!(
            path = %manager.store.path().display(),
            entries = manager.long_term.len(),
            strategy = %manager.vectorizer.strategy(),
            backend = %manager.index.kind(),
            "long-term memory loaded"
        );
        manager
    }

    /// Record `item`.
    ///
    /// Short-term items are only buffered.  Long-term items are embedded,
    /// indexed and the whole long-term snapshot is rewritten.
    pub fn remember(&mut self, item: &str, long_term: bool) {
        if !long_term {
            self.short_term.push(item.to_string());
            return;
        }
        self.append(item.to_string());
        self.persist();
        debug!(entries = self.long_term.len(), "long-term memory stored");
    }

    /// Copy of the long-term texts or the short-term buffer, oldest first.
    pub fn recall(&self, long_term: bool) -> Vec<String> {
        if long_term {
            self.long_term.iter().map(|e| e.text().to_string()).collect()
        } else {
            self.short_term.clone()
        }
    }

    /// Up to `top_k` long-term texts most similar to `text`, best first.
    ///
    /// Empty when nothing has been stored or `top_k` is zero.
    pub fn query(&self, text: &str, top_k: usize) -> Vec<ScoredMemory> {
        let k = top_k.min(self.long_term.len());
        if k == 0 {
            return Vec::new();
        }
        let query = self.vectorizer.embed_query(text);
        let hits: Vec<ScoredMemory> = self
            .index
            .search(&query, k)
            .into_iter()
            .filter_map(|(pos, score)| {
                self.long_term.get(pos).map(|e| ScoredMemory {
                    text: e.text().to_string(),
                    score,
                })
            })
            .collect();
        debug!(top_k, hits = hits.len(), "long-term memory queried");
        hits
    }

    /// Empty the short-term buffer.  Long-term state is untouched.
    pub fn clear_short_term(&mut self) {
        self.short_term.clear();
    }

    /// Rebuild the index from the stored entries, zero-padded to the widest.
    ///
    /// Falls back to [`BruteForceIndex`] when the active backend refuses
    /// any row.
    pub fn rebuild_index(&mut self) {
        let width = self.widest();
        self.index.clear();
        if let Err(e) = fill(self.index.as_mut(), &self.long_term, width) {
            warn!(
                error = %e,
                backend = %self.index.kind(),
                "index rejected rebuild; switching to brute-force scan"
            );
            let mut fallback = BruteForceIndex::new();
            // The brute-force scan accepts every vector.
            let _ = fill(&mut fallback, &self.long_term, width);
            self.index = Box::new(fallback);
        }
        debug!(
            entries = self.long_term.len(),
            width,
            backend = %self.index.kind(),
            "similarity index rebuilt"
        );
    }

    /// Number of long-term entries.
    pub fn len(&self) -> usize {
        self.long_term.len()
    }

    pub fn is_empty(&self) -> bool {
        self.long_term.is_empty()
    }

    pub fn short_term_len(&self) -> usize {
        self.short_term.len()
    }

    /// Stored long-term entries in insertion order.
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.long_term
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// The backend currently answering queries.
    pub fn backend(&self) -> IndexBackend {
        self.index.kind()
    }

    pub fn strategy(&self) -> EmbeddingStrategy {
        self.vectorizer.strategy()
    }

    /// Vocabulary size under the counting strategy, `None` otherwise.
    pub fn vocabulary_size(&self) -> Option<usize> {
        self.vectorizer.vocabulary().map(|v| v.len())
    }

    fn append(&mut self, text: String) {
        let vector = self.vectorizer.embed(&text);
        let added = self.index.add(&vector);
        self.long_term.push(MemoryEntry::new(text, vector));
        if let Err(e) = added {
            debug!(error = %e, "index refused new vector; rebuilding");
            self.rebuild_index();
        }
    }

    fn persist(&self) {
        self.store.save(&self.recall(true));
    }

    fn widest(&self) -> usize {
        self.long_term
            .iter()
            .map(|e| e.vector().len())
            .max()
            .unwrap_or(0)
    }
}

fn fill(
    index: &mut dyn SimilarityIndex,
    entries: &[MemoryEntry],
    width: usize,
) -> Result<(), IndexError> {
    for entry in entries {
        index.add(&pad_to(entry.vector(), width))?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// SharedMemory
// ─────────────────────────────────────────────────────────────────────────────

/// Cloneable, thread-safe handle to one [`MemoryManager`].
///
/// Every operation holds a single lock for its whole duration, so a
/// long-term `remember` (embed, index, persist) is never interleaved with a
/// query or another `remember`.
#[derive(Debug, Clone)]
pub struct SharedMemory {
    inner: Arc<Mutex<MemoryManager>>,
}

impl SharedMemory {
    pub fn new(manager: MemoryManager) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    pub fn open(config: &MemoryConfig) -> Self {
        Self::new(MemoryManager::open(config))
    }

    // A panic mid-operation cannot leave the store half-written in memory,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, MemoryManager> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn remember(&self, item: &str, long_term: bool) {
        self.lock().remember(item, long_term);
    }

    pub fn recall(&self, long_term: bool) -> Vec<String> {
        self.lock().recall(long_term)
    }

    pub fn query(&self, text: &str, top_k: usize) -> Vec<ScoredMemory> {
        self.lock().query(text, top_k)
    }

    pub fn clear_short_term(&self) {
        self.lock().clear_short_term();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
