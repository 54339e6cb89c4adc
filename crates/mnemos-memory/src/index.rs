//! Similarity Index.
//!
//! Holds vectors in insertion order and answers top-k similarity queries.
//! Every backend implements [`SimilarityIndex`]; the memory manager picks one
//! with [`select_backend`] at construction and never branches on the backend
//! afterwards.
//!
//! | Backend | Scoring | Requirements |
//! |---|---|---|
//! | [`BruteForceIndex`] | cosine similarity, exhaustive scan | none |
//! | [`FlatInnerProductIndex`] | exact inner product over a contiguous matrix | unit vectors of one fixed width; `flat-ip` feature |
//!
//! Results are `(position, score)` pairs sorted by descending score.  Equal
//! scores keep insertion order, so the earlier position always wins a tie.
//!
//! # Example
//!
//! ```rust
//! use mnemos_memory::index::{BruteForceIndex, SimilarityIndex};
//!
//! let mut index = BruteForceIndex::new();
//! index.add(&[1.0, 0.0]).unwrap();
//! index.add(&[0.0, 1.0, 0.0]).unwrap();
//!
//! // Shorter vectors are zero-padded, so mixed widths compare cleanly.
//! let hits = index.search(&[0.0, 1.0, 0.0], 1);
//! assert_eq!(hits[0].0, 1);
//! ```

use mnemos_types::{IndexBackend, MemoryConfig};
use thiserror::Error;
use tracing::{info, warn};

use crate::vectorizer::{Vectorizer, l2_norm};

/// Largest deviation from unit length still accepted as normalized.
pub const NORM_TOLERANCE: f32 = 1e-3;

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Reasons a backend refuses a vector.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("vector has {found} dimensions but the index holds {expected}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("vector norm {norm} is not unit length")]
    NotNormalized { norm: f32 },
}

// ─────────────────────────────────────────────────────────────────────────────
// Cosine similarity
// ─────────────────────────────────────────────────────────────────────────────

/// Cosine similarity of `a` and `b`, treating the shorter one as if it were
/// right-padded with zeros.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` if either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    // Padding zeros add nothing to the dot product or either norm.
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Sort by descending score, keep insertion order on ties, cut to `k`.
fn rank(mut scored: Vec<(usize, f32)>, k: usize) -> Vec<(usize, f32)> {
    // `sort_by` is stable and positions arrive ascending.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);
    scored
}

// ─────────────────────────────────────────────────────────────────────────────
// SimilarityIndex trait
// ─────────────────────────────────────────────────────────────────────────────

/// Contract shared by every index backend.
pub trait SimilarityIndex: Send {
    /// Append `vector` at the next position.
    fn add(&mut self, vector: &[f32]) -> Result<(), IndexError>;

    /// At most `k` `(position, score)` pairs, best first.
    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every vector, ready for a rebuild.
    fn clear(&mut self);

    fn kind(&self) -> IndexBackend;
}

// ─────────────────────────────────────────────────────────────────────────────
// BruteForceIndex
// ─────────────────────────────────────────────────────────────────────────────

/// Exhaustive cosine scan.  Accepts vectors of any width and norm.
#[derive(Debug, Clone, Default)]
pub struct BruteForceIndex {
    vectors: Vec<Vec<f32>>,
}

impl BruteForceIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SimilarityIndex for BruteForceIndex {
    fn add(&mut self, vector: &[f32]) -> Result<(), IndexError> {
        self.vectors.push(vector.to_vec());
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if k == 0 {
            return Vec::new();
        }
        let scored = self
            .vectors
            .iter()
            .enumerate()
            .map(|(pos, v)| (pos, cosine_similarity(v, query)))
            .collect();
        rank(scored, k)
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn clear(&mut self) {
        self.vectors.clear();
    }

    fn kind(&self) -> IndexBackend {
        IndexBackend::BruteForce
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FlatInnerProductIndex
// ─────────────────────────────────────────────────────────────────────────────

/// Exact inner-product search over a row-major matrix of unit vectors.
///
/// Every row has the same width, fixed either up front or by the first
/// insert.  The matrix cannot pad rows retroactively, so a vector of any
/// other width is rejected with [`IndexError::DimensionMismatch`] and the
/// owner is expected to clear and re-add everything at the new width.
/// Zero vectors are accepted and score `0.0` against everything.
#[cfg(feature = "flat-ip")]
#[derive(Debug, Clone, Default)]
pub struct FlatInnerProductIndex {
    pinned: Option<usize>,
    dimension: Option<usize>,
    data: Vec<f32>,
    rows: usize,
}

#[cfg(feature = "flat-ip")]
impl FlatInnerProductIndex {
    /// `dimension` pins the row width; `None` lets the first insert pick it.
    pub fn new(dimension: Option<usize>) -> Self {
        Self {
            pinned: dimension,
            dimension,
            data: Vec::new(),
            rows: 0,
        }
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn row(&self, i: usize, width: usize) -> &[f32] {
        &self.data[i * width..(i + 1) * width]
    }
}

#[cfg(feature = "flat-ip")]
impl SimilarityIndex for FlatInnerProductIndex {
    fn add(&mut self, vector: &[f32]) -> Result<(), IndexError> {
        if let Some(expected) = self.dimension
            && expected != vector.len()
        {
            return Err(IndexError::DimensionMismatch {
                expected,
                found: vector.len(),
            });
        }
        let norm = l2_norm(vector);
        if norm != 0.0 && (norm - 1.0).abs() > NORM_TOLERANCE {
            return Err(IndexError::NotNormalized { norm });
        }
        self.dimension = Some(vector.len());
        self.data.extend_from_slice(vector);
        self.rows += 1;
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let Some(width) = self.dimension else {
            return Vec::new();
        };
        if k == 0 || self.rows == 0 {
            return Vec::new();
        }
        // Normalize over the full query so tail components the rows lack
        // still shrink the score, exactly as cosine would.
        let norm = l2_norm(query);
        if norm == 0.0 {
            return rank((0..self.rows).map(|i| (i, 0.0)).collect(), k);
        }
        let scored = (0..self.rows)
            .map(|i| {
                let dot: f32 = self.row(i, width).iter().zip(query).map(|(x, y)| x * y).sum();
                (i, (dot / norm).clamp(-1.0, 1.0))
            })
            .collect();
        rank(scored, k)
    }

    fn len(&self) -> usize {
        self.rows
    }

    fn clear(&mut self) {
        self.data.clear();
        self.rows = 0;
        self.dimension = self.pinned;
    }

    fn kind(&self) -> IndexBackend {
        IndexBackend::FlatInnerProduct
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend selection
// ─────────────────────────────────────────────────────────────────────────────

/// Whether the accelerated backend can serve vectors from `vectorizer`.
///
/// Requires the `flat-ip` feature and a vectorizer that emits unit vectors.
pub fn accelerated_available(vectorizer: &dyn Vectorizer) -> bool {
    cfg!(feature = "flat-ip") && vectorizer.is_normalized()
}

#[cfg(feature = "flat-ip")]
fn accelerated(dimension: Option<usize>) -> Option<Box<dyn SimilarityIndex>> {
    Some(Box::new(FlatInnerProductIndex::new(dimension)))
}

#[cfg(not(feature = "flat-ip"))]
fn accelerated(_dimension: Option<usize>) -> Option<Box<dyn SimilarityIndex>> {
    None
}

/// Pick the index backend once, at construction, from `config.backend`.
///
/// Anything that cannot run the accelerated backend gets the brute-force
/// scan, which answers identically at a higher per-query cost.
pub fn select_backend(
    config: &MemoryConfig,
    vectorizer: &dyn Vectorizer,
) -> Box<dyn SimilarityIndex> {
    let requested = config.backend;
    if requested != IndexBackend::BruteForce
        && accelerated_available(vectorizer)
        && let Some(index) = accelerated(vectorizer.dimension())
    {
        info!(backend = %IndexBackend::FlatInnerProduct, "similarity index selected");
        return index;
    }
    if requested == IndexBackend::FlatInnerProduct {
        warn!(
            strategy = %vectorizer.strategy(),
            normalized = vectorizer.is_normalized(),
            "accelerated index unavailable; falling back to brute-force scan"
        );
    }
    info!(backend = %IndexBackend::BruteForce, "similarity index selected");
    Box::new(BruteForceIndex::new())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::{CountingVectorizer, HashedVectorizer};

    // ── cosine_similarity ────────────────────────────────────────────────────

    #[test]
    fn cosine_identical_vectors_is_one() {
        let v = vec![1.0f32, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors_is_zero() {
        assert!(cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite_vectors_is_minus_one() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_zero_vector_returns_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[1.0]), 0.0);
    }

    #[test]
    fn cosine_pads_shorter_vector() {
        let short = [1.0f32, 1.0];
        let long = [1.0f32, 1.0, 0.0, 0.0];
        assert!((cosine_similarity(&short, &long) - 1.0).abs() < 1e-6);
        let longer = [1.0f32, 1.0, 1.0, 1.0];
        let padded = [1.0f32, 1.0, 0.0, 0.0];
        assert!(
            (cosine_similarity(&short, &longer) - cosine_similarity(&padded, &longer)).abs()
                < 1e-6
        );
    }

    // ── BruteForceIndex ──────────────────────────────────────────────────────

    #[test]
    fn brute_force_returns_best_match_first() {
        let mut index = BruteForceIndex::new();
        index.add(&[0.0, 0.0, 1.0]).unwrap();
        index.add(&[1.0, 0.0, 0.0]).unwrap();
        let hits = index.search(&[1.0, 0.0, 0.0], 2);
        assert_eq!(hits[0].0, 1);
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].0, 0);
    }

    #[test]
    fn brute_force_ties_keep_insertion_order() {
        let mut index = BruteForceIndex::new();
        for _ in 0..4 {
            index.add(&[1.0, 1.0]).unwrap();
        }
        let positions: Vec<usize> = index.search(&[1.0, 1.0], 4).iter().map(|h| h.0).collect();
        assert_eq!(positions, vec![0, 1, 2, 3]);
    }

    #[test]
    fn brute_force_limits_to_k() {
        let mut index = BruteForceIndex::new();
        for i in 0..5 {
            index.add(&[i as f32, 1.0]).unwrap();
        }
        assert_eq!(index.search(&[2.0, 1.0], 3).len(), 3);
        assert_eq!(index.search(&[2.0, 1.0], 10).len(), 5);
        assert!(index.search(&[2.0, 1.0], 0).is_empty());
    }

    #[test]
    fn brute_force_clear_empties() {
        let mut index = BruteForceIndex::new();
        index.add(&[1.0]).unwrap();
        index.clear();
        assert!(index.is_empty());
        assert!(index.search(&[1.0], 1).is_empty());
    }

    // ── FlatInnerProductIndex ────────────────────────────────────────────────

    #[cfg(feature = "flat-ip")]
    #[test]
    fn flat_matches_brute_force_on_unit_vectors() {
        let rows = [[0.6f32, 0.8, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]];
        let mut flat = FlatInnerProductIndex::new(None);
        let mut brute = BruteForceIndex::new();
        for r in &rows {
            flat.add(r).unwrap();
            brute.add(r).unwrap();
        }
        let query = [3.0f32, 1.0, 0.5];
        let a = flat.search(&query, 3);
        let b = brute.search(&query, 3);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.0, y.0);
            assert!((x.1 - y.1).abs() < 1e-5);
        }
    }

    #[cfg(feature = "flat-ip")]
    #[test]
    fn flat_rejects_width_change() {
        let mut flat = FlatInnerProductIndex::new(None);
        flat.add(&[1.0, 0.0]).unwrap();
        let err = flat.add(&[0.0, 0.0, 1.0]).unwrap_err();
        assert_eq!(err, IndexError::DimensionMismatch { expected: 2, found: 3 });
        assert_eq!(flat.len(), 1);
    }

    #[cfg(feature = "flat-ip")]
    #[test]
    fn flat_rejects_unnormalized_rows() {
        let mut flat = FlatInnerProductIndex::new(Some(2));
        assert!(matches!(
            flat.add(&[3.0, 4.0]),
            Err(IndexError::NotNormalized { .. })
        ));
        assert!(flat.add(&[0.0, 0.0]).is_ok());
    }

    #[cfg(feature = "flat-ip")]
    #[test]
    fn flat_clear_restores_pinned_width() {
        let mut flat = FlatInnerProductIndex::new(None);
        flat.add(&[1.0, 0.0]).unwrap();
        flat.clear();
        assert_eq!(flat.dimension(), None);
        flat.add(&[0.0, 0.0, 1.0]).unwrap();
        assert_eq!(flat.dimension(), Some(3));

        let mut pinned = FlatInnerProductIndex::new(Some(4));
        pinned.clear();
        assert_eq!(pinned.dimension(), Some(4));
    }

    #[cfg(feature = "flat-ip")]
    #[test]
    fn flat_longer_query_tail_lowers_score() {
        let mut flat = FlatInnerProductIndex::new(None);
        flat.add(&[1.0, 0.0]).unwrap();
        let hits = flat.search(&[1.0, 0.0, 1.0], 1);
        let expected = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 1.0]);
        assert!((hits[0].1 - expected).abs() < 1e-6);
    }

    #[cfg(feature = "flat-ip")]
    #[test]
    fn flat_zero_query_scores_zero() {
        let mut flat = FlatInnerProductIndex::new(None);
        flat.add(&[1.0, 0.0]).unwrap();
        assert_eq!(flat.search(&[0.0, 0.0], 5), vec![(0, 0.0)]);
    }

    // ── select_backend ───────────────────────────────────────────────────────

    fn asking(backend: IndexBackend) -> MemoryConfig {
        MemoryConfig::default().with_backend(backend)
    }

    #[cfg(feature = "flat-ip")]
    #[test]
    fn normalized_counting_config_gets_flat() {
        let cfg = MemoryConfig::default().with_normalized_counts(true);
        let v = crate::vectorizer::build_vectorizer(&cfg);
        let index = select_backend(&cfg, v.as_ref());
        assert_eq!(index.kind(), IndexBackend::FlatInnerProduct);
    }

    #[test]
    fn unnormalized_counting_always_gets_brute_force() {
        let v = CountingVectorizer::new();
        assert!(!accelerated_available(&v));
        let index = select_backend(&asking(IndexBackend::FlatInnerProduct), &v);
        assert_eq!(index.kind(), IndexBackend::BruteForce);
    }

    #[test]
    fn explicit_brute_force_is_honoured() {
        let v = HashedVectorizer::new(16);
        let index = select_backend(&asking(IndexBackend::BruteForce), &v);
        assert_eq!(index.kind(), IndexBackend::BruteForce);
    }

    #[cfg(feature = "flat-ip")]
    #[test]
    fn auto_picks_flat_for_hashed() {
        let v = HashedVectorizer::new(16);
        let index = select_backend(&asking(IndexBackend::Auto), &v);
        assert_eq!(index.kind(), IndexBackend::FlatInnerProduct);
    }

    #[cfg(not(feature = "flat-ip"))]
    #[test]
    fn auto_without_feature_is_brute_force() {
        let v = HashedVectorizer::new(16);
        let index = select_backend(&asking(IndexBackend::Auto), &v);
        assert_eq!(index.kind(), IndexBackend::BruteForce);
    }
}
