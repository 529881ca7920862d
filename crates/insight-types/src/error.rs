//! Shared error type for the document insight core.

use thiserror::Error;

/// Unified error type for cross-cutting concerns.
#[derive(Debug, Error)]
pub enum InsightError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed or empty input, rejected before any work starts
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),
}
