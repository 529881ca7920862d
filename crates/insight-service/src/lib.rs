//! Service facade: the six external operations of the insight engine.
//!
//! This crate wires the ingestion path, the agent pipeline, the chunk
//! index, and the history store behind one struct so outer layers
//! (HTTP, CLI) never touch the internals directly.

pub mod error;
pub mod service;

pub use error::ServiceError;
pub use service::{CollectionStats, HistoryEntry, HistoryListing, IngestReport, InsightService};
