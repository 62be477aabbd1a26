//! Indexing and ranking core for a small movie-collection search engine.
//!
//! Four field-scoped inverted indexes are built over a document collection
//! (`documents`, `stars`, `genres`, `summaries`). Derived views (tiers,
//! collection metadata) and a [`Scorer`] with vector-space, BM25 and unigram
//! language-model ranking sit on top. MinHash/LSH near-duplicate detection and
//! shingle-based spell correction share the [`similarity`] primitives.
//!
//! Nothing in this crate locks internally: an [`InvertedIndex`] shared between
//! threads must be wrapped by the caller (e.g. `parking_lot::RwLock`).

pub mod document;
pub mod error;
pub mod index;
pub mod lsh;
pub mod metadata;
pub mod persist;
pub mod scorer;
pub mod similarity;
pub mod spell;
pub mod tiered;

pub use document::{DocId, Document, Field, IndexKind};
pub use error::{Error, Result};
pub use index::{InvertedIndex, PostingList, SubIndex};
pub use lsh::{LshBuckets, LshParams, MinHashLsh, SignatureMatrix};
pub use metadata::{AverageLengths, LengthUnit, MetadataIndex};
pub use scorer::{RetrievalMethod, Scorer, SmartScheme, Smoothing, UnigramParams};
pub use spell::SpellCorrector;
pub use tiered::{Tier, TierThresholds, TieredIndex};
