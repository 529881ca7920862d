//! # insight-index
//!
//! Persisted chunk vector index for the document insight core.
//!
//! This crate provides exact inner-product similarity search over
//! L2-normalized chunk vectors with denormalized metadata for filtering.
//!
//! ## Features
//! - Deterministic ranking: descending similarity, ties broken by
//!   insertion order (earlier-inserted chunk first)
//! - Atomic batch insert with respect to concurrent searches
//! - Per-document removal for cascade deletes
//! - Durable JSON persistence; a missing or corrupt file loads as an
//!   empty index with a warning, never an error

pub mod error;
pub mod flat;

pub use error::IndexError;
pub use flat::{ChunkIndex, IndexConfig, IndexEntry, IndexStats, ScoredEntry, SearchFilter};
