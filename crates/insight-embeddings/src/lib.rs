//! # insight-embeddings
//!
//! Text embedding for the document insight core.
//!
//! This crate provides the `Embedding` value type plus the
//! `EmbeddingProvider` trait that the ingestion and retrieval paths
//! consume. The production implementation calls an OpenAI-compatible
//! embeddings endpoint with bounded retry and backoff; a deterministic
//! mock supports testing without a network.

pub mod api;
pub mod error;
pub mod mock;
pub mod model;

pub use api::{ApiEmbedder, ApiEmbedderConfig};
pub use error::EmbeddingError;
pub use mock::MockEmbedder;
pub use model::{Embedding, EmbeddingProvider};
