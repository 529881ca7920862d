//! Reasoning provider error types.

use thiserror::Error;

/// Errors that can occur during reasoning operations.
#[derive(Debug, Error)]
pub enum ReasoningError {
    /// API request failed
    #[error("API request failed: {0}")]
    Api(String),

    /// Failed to parse the API response
    #[error("Failed to parse API response: {0}")]
    Parse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}
