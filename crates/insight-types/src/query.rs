//! Query run types: parsed queries, retrieved sources, answers, evaluations.
//!
//! A `QueryRecord` is the unit of history: one append-only entry per
//! pipeline run. Evaluations are a list because re-evaluation appends a new
//! record rather than overwriting the prior one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured query type produced by the parse stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// A question answerable by a specific fact (the degraded fallback)
    #[default]
    Factual,
    /// Compares two or more subjects
    Comparison,
    /// Asks for an overview of a larger body of content
    Summary,
    /// Requires reasoning over multiple data points
    Analytical,
    /// Anything that fits none of the above
    General,
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKind::Factual => write!(f, "factual"),
            QueryKind::Comparison => write!(f, "comparison"),
            QueryKind::Summary => write!(f, "summary"),
            QueryKind::Analytical => write!(f, "analytical"),
            QueryKind::General => write!(f, "general"),
        }
    }
}

/// Output of the parse stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// What the user is trying to accomplish
    pub intent: String,

    /// Named entities, key terms, dates, metrics
    pub entities: Vec<String>,

    /// Structured query type
    pub kind: QueryKind,
}

impl ParsedQuery {
    /// Fallback parse: treat the raw text as a generic factual query.
    pub fn fallback(raw_text: &str) -> Self {
        Self {
            intent: format!("Answer: {}", raw_text.trim()),
            entities: Vec::new(),
            kind: QueryKind::Factual,
        }
    }
}

/// A point-in-time snapshot of a retrieved chunk.
///
/// Owned by the run that produced it; never shared across queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Chunk id this source snapshots
    pub chunk_id: String,

    /// Parent document of the chunk
    pub document_id: String,

    /// Filename of the parent document
    pub filename: String,

    /// Position of the chunk within its document
    pub ordinal: usize,

    /// The chunk text at retrieval time
    pub text: String,

    /// Similarity score against the query vector
    pub score: f32,

    /// 1-based rank within this run's result list
    pub rank: usize,
}

/// Final synthesized answer with citations into the run's source list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The answer text
    pub text: String,

    /// Ordered key points extracted from the answer
    pub key_points: Vec<String>,

    /// 1-based indices into the run's source list, matching the bracketed
    /// source numbering shown to the model. Always within 1..=sources.len():
    /// out-of-range indices from the model are dropped during synthesis.
    pub citations: Vec<usize>,

    /// True when no retrieved context backed the answer
    pub ungrounded: bool,
}

/// Named per-criterion sub-scores, each on the 0-5 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionScores {
    pub accuracy: f32,
    pub completeness: f32,
    pub relevance: f32,
    pub clarity: f32,
    pub coherence: f32,
}

impl CriterionScores {
    /// Clamp every criterion into the 0-5 scale.
    pub fn clamped(self) -> Self {
        Self {
            accuracy: self.accuracy.clamp(0.0, 5.0),
            completeness: self.completeness.clamp(0.0, 5.0),
            relevance: self.relevance.clamp(0.0, 5.0),
            clarity: self.clarity.clamp(0.0, 5.0),
            coherence: self.coherence.clamp(0.0, 5.0),
        }
    }
}

/// Quality judgment of an answer, produced by the evaluate stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// Overall score on the 0-5 scale
    pub score: f32,

    /// Per-criterion sub-scores
    pub criteria: CriterionScores,

    /// Judge rationale text
    pub rationale: String,

    /// When this evaluation was produced
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub evaluated_at: DateTime<Utc>,
}

/// Pipeline stage names, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parse,
    Retrieve,
    Analyze,
    Summarize,
    Evaluate,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Parse => write!(f, "parse"),
            Stage::Retrieve => write!(f, "retrieve"),
            Stage::Analyze => write!(f, "analyze"),
            Stage::Summarize => write!(f, "summarize"),
            Stage::Evaluate => write!(f, "evaluate"),
        }
    }
}

/// How a stage finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Primary path succeeded
    Completed,
    /// Fallback behavior was used after the primary path failed
    Degraded,
    /// No safe fallback existed; the run carries partial results
    Failed,
}

/// One entry in a run's execution trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTrace {
    pub stage: Stage,
    pub status: StageStatus,
    pub duration_ms: u64,
}

/// One completed (or partially degraded) pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Unique identifier (ULID string)
    pub id: String,

    /// Raw user query text
    pub text: String,

    /// Caller-supplied session grouping key
    pub session_id: Option<String>,

    /// When the run started
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Parse-stage output (degraded or not)
    pub parsed: Option<ParsedQuery>,

    /// Sources retrieved for this run, in rank order
    pub sources: Vec<Source>,

    /// Synthesized answer; absent when the run failed before synthesis
    pub answer: Option<Answer>,

    /// Evaluations in creation order; re-evaluation appends
    pub evaluations: Vec<Evaluation>,

    /// Stages that completed via fallback
    pub degraded_stages: Vec<Stage>,

    /// Stages that failed with no fallback
    pub failed_stages: Vec<Stage>,

    /// Per-stage execution trace
    pub trace: Vec<StageTrace>,
}

impl QueryRecord {
    /// The most recent evaluation, if any.
    pub fn latest_evaluation(&self) -> Option<&Evaluation> {
        self.evaluations.last()
    }

    /// First line of the answer, truncated, for history listings.
    pub fn answer_summary(&self, max_len: usize) -> String {
        let text = self
            .answer
            .as_ref()
            .map(|a| a.text.as_str())
            .unwrap_or_default();
        let first_line = text.lines().next().unwrap_or_default();
        if first_line.chars().count() <= max_len {
            first_line.to_string()
        } else {
            let truncated: String = first_line.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", truncated)
        }
    }
}
