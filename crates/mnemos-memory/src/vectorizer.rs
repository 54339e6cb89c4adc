//! Text Vectorizer.
//!
//! Turns free text into numeric vectors.  Two interchangeable strategies are
//! provided behind the [`Vectorizer`] trait:
//!
//! * [`CountingVectorizer`] – exact token counts over a [`Vocabulary`] that
//!   assigns positions in first-seen order and only ever grows.  Vectors are
//!   as wide as the vocabulary was when they were produced, so older vectors
//!   may be shorter than newer ones and must be zero-padded before use.
//! * [`HashedVectorizer`] – token counts folded into `D` buckets by a stable
//!   hash and L2-normalized.  The width never changes.  Unrelated tokens that
//!   land in the same bucket reinforce each other, which inflates similarity
//!   between texts that share no words; this is an accepted approximation of
//!   the fixed-width scheme, not something the store tries to correct.
//!
//! Tokenization is the same for both: lower-case, then split on whitespace.
//!
//! # Example
//!
//! ```rust
//! use mnemos_memory::vectorizer::{CountingVectorizer, Vectorizer};
//!
//! let mut v = CountingVectorizer::new();
//! let first = v.embed("the reactor is safe");
//! let second = v.embed("the coolant");
//!
//! assert_eq!(first, vec![1.0, 1.0, 1.0, 1.0]);
//! assert_eq!(second, vec![1.0, 0.0, 0.0, 0.0, 1.0]);
//! ```

use mnemos_types::{EmbeddingStrategy, MemoryConfig};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Lower-case `text` and split it on whitespace.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Euclidean norm of `v`.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale `v` to unit length in place.  A zero vector is left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Copy of `v` right-padded with zeros to `len`.  Never truncates.
pub fn pad_to(v: &[f32], len: usize) -> Vec<f32> {
    let mut out = v.to_vec();
    if out.len() < len {
        out.resize(len, 0.0);
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Vectorizer trait
// ─────────────────────────────────────────────────────────────────────────────

/// Common contract for every embedding strategy.
///
/// The similarity index and the memory manager only ever see vectors through
/// this trait, so strategies can be swapped without touching either.
pub trait Vectorizer: Send {
    /// Embed text that is about to be stored.  May grow internal state.
    fn embed(&mut self, text: &str) -> Vec<f32>;

    /// Embed a query.  Never mutates internal state.
    fn embed_query(&self, text: &str) -> Vec<f32>;

    /// Fixed output width, or `None` when the width grows over time.
    fn dimension(&self) -> Option<usize>;

    /// Whether every non-zero output has unit length.
    fn is_normalized(&self) -> bool;

    fn strategy(&self) -> EmbeddingStrategy;

    /// The growing vocabulary, for strategies that keep one.
    fn vocabulary(&self) -> Option<&Vocabulary> {
        None
    }
}

/// Build the vectorizer described by `config`.
pub fn build_vectorizer(config: &MemoryConfig) -> Box<dyn Vectorizer> {
    match config.strategy {
        EmbeddingStrategy::Counting => {
            let mut v = CountingVectorizer::new();
            v.normalize = config.normalize_counts;
            Box::new(v)
        }
        EmbeddingStrategy::Hashed => Box::new(HashedVectorizer::new(config.hash_dimensions)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Vocabulary
// ─────────────────────────────────────────────────────────────────────────────

/// Token → position mapping, assigned in first-seen order.
///
/// Positions are never reassigned or removed.  Replaying the same texts in
/// the same order always yields the same mapping, so a vocabulary can be
/// rebuilt from the stored texts alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    indices: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a vocabulary by replaying `texts` in order.
    pub fn from_texts<'a, I>(texts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut vocab = Self::new();
        for text in texts {
            for token in tokenize(text) {
                vocab.insert(token);
            }
        }
        vocab
    }

    /// Position of `token`, assigning the next free slot if it is new.
    pub fn insert(&mut self, token: String) -> usize {
        let next = self.indices.len();
        *self.indices.entry(token).or_insert(next)
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.indices.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Monotonic version number.  Equal to the size since slots only grow.
    pub fn version(&self) -> usize {
        self.indices.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CountingVectorizer
// ─────────────────────────────────────────────────────────────────────────────

/// Exact token counts over a growing [`Vocabulary`].
#[derive(Debug, Clone, Default)]
pub struct CountingVectorizer {
    vocab: Vocabulary,
    normalize: bool,
}

impl CountingVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counting vectorizer whose outputs are L2-normalized.
    pub fn normalized() -> Self {
        Self {
            vocab: Vocabulary::new(),
            normalize: true,
        }
    }

    fn finish(&self, mut vec: Vec<f32>) -> Vec<f32> {
        if self.normalize {
            l2_normalize(&mut vec);
        }
        vec
    }
}

impl Vectorizer for CountingVectorizer {
    fn embed(&mut self, text: &str) -> Vec<f32> {
        let slots: Vec<usize> = tokenize(text)
            .into_iter()
            .map(|token| self.vocab.insert(token))
            .collect();
        let mut vec = vec![0.0f32; self.vocab.len()];
        for slot in slots {
            vec[slot] += 1.0;
        }
        self.finish(vec)
    }

    fn embed_query(&self, text: &str) -> Vec<f32> {
        // Unknown tokens get private tail slots so they still count towards
        // the query norm without touching the shared vocabulary.
        let width = self.vocab.len();
        let mut unseen: HashMap<String, usize> = HashMap::new();
        let slots: Vec<usize> = tokenize(text)
            .into_iter()
            .map(|token| match self.vocab.index_of(&token) {
                Some(slot) => slot,
                None => {
                    let next = width + unseen.len();
                    *unseen.entry(token).or_insert(next)
                }
            })
            .collect();
        let mut vec = vec![0.0f32; width + unseen.len()];
        for slot in slots {
            vec[slot] += 1.0;
        }
        self.finish(vec)
    }

    fn dimension(&self) -> Option<usize> {
        None
    }

    fn is_normalized(&self) -> bool {
        self.normalize
    }

    fn strategy(&self) -> EmbeddingStrategy {
        EmbeddingStrategy::Counting
    }

    fn vocabulary(&self) -> Option<&Vocabulary> {
        Some(&self.vocab)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HashedVectorizer
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed-width hashed bag-of-words.
#[derive(Debug, Clone)]
pub struct HashedVectorizer {
    dimensions: usize,
}

impl HashedVectorizer {
    /// `dimensions` is clamped to at least 1.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Bucket for `token`.  Derived from SHA-256 so it is identical across
    /// processes, platforms and compiler versions.
    pub fn bucket(&self, token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(head) % self.dimensions as u64) as usize
    }

    fn hash_embed(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimensions];
        for token in tokenize(text) {
            vec[self.bucket(&token)] += 1.0;
        }
        l2_normalize(&mut vec);
        vec
    }
}

impl Vectorizer for HashedVectorizer {
    fn embed(&mut self, text: &str) -> Vec<f32> {
        self.hash_embed(text)
    }

    fn embed_query(&self, text: &str) -> Vec<f32> {
        self.hash_embed(text)
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimensions)
    }

    fn is_normalized(&self) -> bool {
        true
    }

    fn strategy(&self) -> EmbeddingStrategy {
        EmbeddingStrategy::Hashed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── tokenize ─────────────────────────────────────────────────────────────

    #[test]
    fn tokenize_lowercases_and_splits_on_any_whitespace() {
        assert_eq!(
            tokenize("  The  Reactor\tis\nSAFE "),
            vec!["the", "reactor", "is", "safe"]
        );
    }

    #[test]
    fn tokenize_empty_text_yields_nothing() {
        assert!(tokenize("   ").is_empty());
    }

    // ── helpers ──────────────────────────────────────────────────────────────

    #[test]
    fn pad_to_extends_but_never_truncates() {
        assert_eq!(pad_to(&[1.0], 3), vec![1.0, 0.0, 0.0]);
        assert_eq!(pad_to(&[1.0, 2.0], 1), vec![1.0, 2.0]);
    }

    #[test]
    fn l2_normalize_leaves_zero_vector_alone() {
        let mut v = vec![0.0f32; 4];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0; 4]);
    }

    // ── Vocabulary ───────────────────────────────────────────────────────────

    #[test]
    fn vocabulary_assigns_first_seen_positions() {
        let mut vocab = Vocabulary::new();
        assert_eq!(vocab.insert("b".into()), 0);
        assert_eq!(vocab.insert("a".into()), 1);
        assert_eq!(vocab.insert("b".into()), 0);
        assert_eq!(vocab.version(), 2);
    }

    #[test]
    fn vocabulary_replay_reproduces_embedding_state() {
        let texts = ["the reactor is safe", "coolant flow is stable", "The core"];
        let mut v = CountingVectorizer::new();
        for t in texts {
            v.embed(t);
        }
        let replayed = Vocabulary::from_texts(texts);
        assert_eq!(v.vocabulary(), Some(&replayed));
        assert_eq!(replayed.index_of("core"), Some(7));
    }

    // ── CountingVectorizer ───────────────────────────────────────────────────

    #[test]
    fn counting_counts_repeated_tokens() {
        let mut v = CountingVectorizer::new();
        assert_eq!(v.embed("go Go go stop"), vec![3.0, 1.0]);
    }

    #[test]
    fn counting_older_vectors_stay_shorter() {
        let mut v = CountingVectorizer::new();
        let old = v.embed("alpha beta");
        let new = v.embed("gamma");
        assert_eq!(old.len(), 2);
        assert_eq!(new, vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn counting_query_does_not_grow_vocabulary() {
        let mut v = CountingVectorizer::new();
        v.embed("alpha beta");
        let q = v.embed_query("beta omega omega");
        assert_eq!(v.vocabulary().map(Vocabulary::len), Some(2));
        // Known token in place, unseen token in a private tail slot.
        assert_eq!(q, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn counting_normalized_outputs_unit_vectors() {
        let mut v = CountingVectorizer::normalized();
        let e = v.embed("a a b");
        assert!((l2_norm(&e) - 1.0).abs() < 1e-6);
        assert!(v.is_normalized());
    }

    #[test]
    fn counting_empty_text_is_zero_vector() {
        let mut v = CountingVectorizer::new();
        v.embed("one two");
        assert_eq!(v.embed(""), vec![0.0, 0.0]);
    }

    // ── HashedVectorizer ─────────────────────────────────────────────────────

    #[test]
    fn hashed_has_fixed_width_and_unit_norm() {
        let mut v = HashedVectorizer::new(64);
        let a = v.embed("the reactor is safe");
        let b = v.embed("a much longer sentence about coolant flow and pumps");
        assert_eq!(a.len(), 64);
        assert_eq!(b.len(), 64);
        assert!((l2_norm(&a) - 1.0).abs() < 1e-5);
        assert_eq!(v.dimension(), Some(64));
    }

    #[test]
    fn hashed_bucket_is_stable_and_case_insensitive_via_tokenize() {
        let v = HashedVectorizer::new(97);
        assert_eq!(v.bucket("reactor"), v.bucket("reactor"));
        assert_eq!(v.embed_query("Reactor"), v.embed_query("reactor"));
    }

    #[test]
    fn hashed_zero_dimensions_clamped() {
        let mut v = HashedVectorizer::new(0);
        assert_eq!(v.embed("anything at all"), vec![1.0]);
    }

    #[test]
    fn hashed_empty_text_is_zero_vector() {
        let v = HashedVectorizer::new(8);
        assert_eq!(v.embed_query(""), vec![0.0; 8]);
    }

    // ── build_vectorizer ─────────────────────────────────────────────────────

    #[test]
    fn build_vectorizer_follows_config() {
        let cfg = MemoryConfig::default().with_strategy(EmbeddingStrategy::Hashed);
        let v = build_vectorizer(&cfg);
        assert_eq!(v.strategy(), EmbeddingStrategy::Hashed);
        assert_eq!(v.dimension(), Some(512));

        let cfg = MemoryConfig::default().with_normalized_counts(true);
        let v = build_vectorizer(&cfg);
        assert_eq!(v.strategy(), EmbeddingStrategy::Counting);
        assert!(v.is_normalized());
    }
}
