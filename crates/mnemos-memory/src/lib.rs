//! `mnemos-memory` – The Semantic Memory Store.
//!
//! Gives an agent a short-term scratch buffer and a long-term memory it can
//! search by similarity, persisted as a plain JSON snapshot of texts.
//!
//! # Modules
//!
//! - [`vectorizer`] – [`Vectorizer`][vectorizer::Vectorizer]: turns text into
//!   vectors, either by exact counting over a growing
//!   [`Vocabulary`][vectorizer::Vocabulary] or by a fixed-width hashed
//!   bag-of-words.
//! - [`index`] – [`SimilarityIndex`][index::SimilarityIndex]: top-k
//!   similarity search, with an always-available brute-force cosine scan and
//!   an exact inner-product matrix used when vectors are unit length.
//! - [`store`] – [`SnapshotStore`][store::SnapshotStore]: best-effort
//!   full-snapshot persistence of the long-term texts.
//! - [`manager`] – [`MemoryManager`][manager::MemoryManager]: the facade
//!   composing the three, plus [`SharedMemory`][manager::SharedMemory] for
//!   callers on several threads.

pub mod index;
pub mod manager;
pub mod store;
pub mod vectorizer;

pub use index::{BruteForceIndex, IndexError, SimilarityIndex, cosine_similarity, select_backend};
#[cfg(feature = "flat-ip")]
pub use index::FlatInnerProductIndex;
pub use manager::{DEFAULT_TOP_K, MemoryManager, SharedMemory};
pub use store::{SnapshotStore, StoreError};
pub use vectorizer::{CountingVectorizer, HashedVectorizer, Vectorizer, Vocabulary};
