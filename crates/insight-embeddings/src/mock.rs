//! Mock embedding provider for testing.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingProvider};

/// Mock provider that generates deterministic embeddings.
///
/// Each lowercase word is hashed into a bucket of the vector, so texts
/// sharing words produce similar vectors. Useful for testing retrieval
/// without making API calls.
pub struct MockEmbedder {
    dimension: usize,
    /// Texts containing this marker always fail
    fail_marker: Option<String>,
    /// When set, every call fails
    fail_all: bool,
}

impl MockEmbedder {
    /// Create a mock embedder with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail_marker: None,
            fail_all: false,
        }
    }

    /// Fail any text containing the given marker.
    pub fn with_failure_marker(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Create a mock embedder that fails every call.
    pub fn failing(dimension: usize) -> Self {
        Self {
            dimension,
            fail_marker: None,
            fail_all: true,
        }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Cannot embed empty text".to_string(),
            ));
        }
        if self.fail_all {
            return Err(EmbeddingError::Api("mock provider unavailable".to_string()));
        }
        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                return Err(EmbeddingError::Api(format!(
                    "mock failure triggered by marker {:?}",
                    marker
                )));
            }
        }

        let mut values = vec![0.0f32; self.dimension];
        for word in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimension;
            values[bucket] += 1.0;
        }

        Ok(Embedding::new(values))
    }
}
