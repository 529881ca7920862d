//! Ingestion error types.

use thiserror::Error;

/// Errors that can occur during document ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Malformed or empty document input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Index error
    #[error("Index error: {0}")]
    Index(#[from] insight_index::IndexError),
}
