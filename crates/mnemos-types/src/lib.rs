//! `mnemos-types` – shared data model for the semantic memory store.
//!
//! Holds the plain types that cross crate boundaries: the stored
//! [`MemoryEntry`], the ranked [`ScoredMemory`] returned by queries, and the
//! construction-time choices bundled in [`MemoryConfig`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default snapshot file used when no path is configured.
pub const DEFAULT_MEMORY_PATH: &str = "memory.json";

/// Default bucket count for the hashed embedding strategy.
pub const DEFAULT_HASH_DIMENSIONS: usize = 512;

// ─────────────────────────────────────────────────────────────────────────────
// Entries
// ─────────────────────────────────────────────────────────────────────────────

/// A remembered long-term item and the vector it was embedded to.
///
/// Entries are never mutated after insertion.  Under the counting strategy a
/// stored vector keeps the width the vocabulary had at insertion time;
/// consumers zero-pad on read instead of patching the entry.
///
/// Vectors are derived state and never written to disk, so the entry has no
/// serde representation; snapshots store texts only.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    text: String,
    vector: Vec<f32>,
}

impl MemoryEntry {
    pub fn new(text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            vector,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }
}

/// A single query hit: the remembered text and its similarity in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMemory {
    pub text: String,
    pub score: f32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Construction choices
// ─────────────────────────────────────────────────────────────────────────────

/// How text is turned into vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingStrategy {
    /// Exact token counts over a growing first-seen vocabulary.
    #[default]
    Counting,
    /// Token counts folded into a fixed number of hash buckets, L2-normalized.
    Hashed,
}

impl std::fmt::Display for EmbeddingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingStrategy::Counting => write!(f, "counting"),
            EmbeddingStrategy::Hashed => write!(f, "hashed"),
        }
    }
}

impl std::str::FromStr for EmbeddingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "counting" | "count" => Ok(EmbeddingStrategy::Counting),
            "hashed" | "hash" => Ok(EmbeddingStrategy::Hashed),
            other => Err(format!("unknown embedding strategy '{other}'")),
        }
    }
}

/// Which similarity index backend the manager should run.
///
/// `Auto` picks the accelerated backend when the capability check passes and
/// the brute-force scan otherwise.  Requesting `FlatInnerProduct` explicitly
/// still falls back to brute force when it is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
    #[default]
    Auto,
    BruteForce,
    FlatInnerProduct,
}

impl std::fmt::Display for IndexBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexBackend::Auto => write!(f, "auto"),
            IndexBackend::BruteForce => write!(f, "brute_force"),
            IndexBackend::FlatInnerProduct => write!(f, "flat_inner_product"),
        }
    }
}

impl std::str::FromStr for IndexBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(IndexBackend::Auto),
            "brute_force" | "bruteforce" => Ok(IndexBackend::BruteForce),
            "flat_inner_product" | "flat_ip" => Ok(IndexBackend::FlatInnerProduct),
            other => Err(format!("unknown index backend '{other}'")),
        }
    }
}

/// Everything a memory manager needs at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Snapshot file holding the long-term texts.
    #[serde(default = "default_path")]
    pub path: PathBuf,

    #[serde(default)]
    pub strategy: EmbeddingStrategy,

    /// Bucket count for [`EmbeddingStrategy::Hashed`]; ignored otherwise.
    #[serde(default = "default_hash_dimensions")]
    pub hash_dimensions: usize,

    /// L2-normalize counting vectors at embed time.  Cosine ranking is
    /// unchanged, but unit vectors make the accelerated backend eligible.
    #[serde(default)]
    pub normalize_counts: bool,

    #[serde(default)]
    pub backend: IndexBackend,
}

fn default_path() -> PathBuf {
    PathBuf::from(DEFAULT_MEMORY_PATH)
}

fn default_hash_dimensions() -> usize {
    DEFAULT_HASH_DIMENSIONS
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            strategy: EmbeddingStrategy::default(),
            hash_dimensions: default_hash_dimensions(),
            normalize_counts: false,
            backend: IndexBackend::default(),
        }
    }
}

impl MemoryConfig {
    /// Default configuration bound to `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: EmbeddingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_backend(mut self, backend: IndexBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_hash_dimensions(mut self, dimensions: usize) -> Self {
        self.hash_dimensions = dimensions;
        self
    }

    pub fn with_normalized_counts(mut self, normalize: bool) -> Self {
        self.normalize_counts = normalize;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let cfg = MemoryConfig::default();
        assert_eq!(cfg.path, PathBuf::from("memory.json"));
        assert_eq!(cfg.strategy, EmbeddingStrategy::Counting);
        assert_eq!(cfg.hash_dimensions, 512);
        assert!(!cfg.normalize_counts);
        assert_eq!(cfg.backend, IndexBackend::Auto);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: MemoryConfig = toml::from_str("strategy = \"hashed\"").unwrap();
        assert_eq!(cfg.strategy, EmbeddingStrategy::Hashed);
        assert_eq!(cfg.path, PathBuf::from("memory.json"));
        assert_eq!(cfg.backend, IndexBackend::Auto);
    }

    #[test]
    fn backend_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&IndexBackend::FlatInnerProduct).unwrap();
        assert_eq!(json, "\"flat_inner_product\"");
    }

    #[test]
    fn strategy_parses_aliases_and_rejects_garbage() {
        assert_eq!("Hash".parse::<EmbeddingStrategy>(), Ok(EmbeddingStrategy::Hashed));
        assert_eq!(" counting ".parse::<EmbeddingStrategy>(), Ok(EmbeddingStrategy::Counting));
        assert!("tfidf".parse::<EmbeddingStrategy>().is_err());
    }

    #[test]
    fn backend_parses_dashes() {
        assert_eq!("brute-force".parse::<IndexBackend>(), Ok(IndexBackend::BruteForce));
        assert_eq!("flat-ip".parse::<IndexBackend>(), Ok(IndexBackend::FlatInnerProduct));
    }

    #[test]
    fn memory_entry_exposes_text_and_vector() {
        let entry = MemoryEntry::new("reactor", vec![1.0, 0.0]);
        assert_eq!(entry.text(), "reactor");
        assert_eq!(entry.vector(), &[1.0, 0.0]);
    }
}
