//! Pipeline error types.

use insight_types::Stage;
use thiserror::Error;

/// Errors that can end a pipeline run without a structured record.
///
/// Stage failures inside a run do NOT surface here: they are recorded
/// on the `QueryRecord` as degraded or failed stages so the caller
/// always receives partial results.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The run was cancelled between stages
    #[error("pipeline run cancelled before {0} stage")]
    Cancelled(Stage),

    /// A provider exhausted its retries outside a run context
    /// (standalone re-evaluation has no record to degrade into)
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),
}
