//! # insight-reasoning
//!
//! Generative reasoning capability for the agent pipeline.
//!
//! The entire orchestration layer depends on the single narrow
//! `ReasoningProvider` trait so it stays independently testable with a
//! deterministic stub. The production implementation speaks to
//! OpenAI-compatible or Anthropic endpoints with bounded retry/backoff.

pub mod api;
pub mod error;
pub mod mock;
pub mod provider;

pub use api::{ApiReasoner, ApiReasonerConfig};
pub use error::ReasoningError;
pub use mock::MockReasoner;
pub use provider::{extract_json, ModelRole, ReasoningProvider};
