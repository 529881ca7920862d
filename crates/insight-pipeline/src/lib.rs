//! Five-stage agent pipeline: Parse → Retrieve → Analyze → Summarize →
//! Evaluate.
//!
//! Each stage is a pure function of its inputs plus one injected
//! capability (embedding or reasoning provider). Stages with a safe
//! fallback degrade instead of failing: Parse falls back to a generic
//! factual reading of the raw text, Retrieve falls back to an empty
//! source list. Analyze and Summarize have no fallback; their failure
//! ends the run with partial results. Evaluate failure leaves the
//! answer in place with no evaluation attached.
//!
//! Cancellation is observed between stages, never inside one.

pub mod analyzer;
pub mod error;
pub mod evaluator;
pub mod parser;
pub mod retriever;
pub mod runner;
pub mod summarizer;

pub use error::PipelineError;
pub use runner::QueryPipeline;
