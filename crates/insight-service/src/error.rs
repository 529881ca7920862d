//! Service error taxonomy.

use thiserror::Error;

use insight_types::Stage;

/// Errors surfaced to callers of the service facade.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Input rejected before any pipeline or storage work
    #[error("validation: {0}")]
    Validation(String),

    /// Referenced document or query does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A provider exhausted its retries with no fallback available
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// The run was cancelled before the named stage
    #[error("cancelled before {0} stage")]
    Cancelled(Stage),

    /// History store failure
    #[error("storage: {0}")]
    Storage(#[from] insight_storage::StorageError),

    /// Chunk index failure
    #[error("index: {0}")]
    Index(#[from] insight_index::IndexError),
}

impl From<insight_ingest::IngestError> for ServiceError {
    fn from(err: insight_ingest::IngestError) -> Self {
        match err {
            insight_ingest::IngestError::InvalidInput(msg) => ServiceError::Validation(msg),
            insight_ingest::IngestError::Index(e) => ServiceError::Index(e),
        }
    }
}

impl From<insight_pipeline::PipelineError> for ServiceError {
    fn from(err: insight_pipeline::PipelineError) -> Self {
        match err {
            insight_pipeline::PipelineError::Cancelled(stage) => ServiceError::Cancelled(stage),
            insight_pipeline::PipelineError::CapabilityUnavailable(msg) => {
                ServiceError::CapabilityUnavailable(msg)
            }
        }
    }
}
