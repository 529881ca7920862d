//! # insight-types
//!
//! Shared domain types for the document insight core.
//!
//! This crate defines the data structures used throughout the system:
//! - Documents and chunks: immutable records of ingested content
//! - Query records: one append-only entry per pipeline run
//! - Answers and evaluations: pipeline outputs with cited sources
//! - Settings: layered configuration types

pub mod config;
pub mod document;
pub mod error;
pub mod query;

pub use config::{
    ChunkingConfig, EmbeddingSettings, ReasoningSettings, RetrievalConfig, Settings,
};
pub use document::{Chunk, Document};
pub use error::InsightError;
pub use query::{
    Answer, CriterionScores, Evaluation, ParsedQuery, QueryKind, QueryRecord, Source, Stage,
    StageStatus, StageTrace,
};
