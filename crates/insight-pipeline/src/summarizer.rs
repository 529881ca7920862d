//! Summarize stage: final answer synthesis with validated citations.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use insight_reasoning::{extract_json, ModelRole, ReasoningError, ReasoningProvider};
use insight_types::{Answer, Source};

const SYSTEM: &str = "You write final answers for a document Q&A system. \
Cite sources by their bracketed numbers. Respond with JSON only.";

/// Wire shape of the model's synthesis reply
#[derive(Deserialize)]
struct SummaryReply {
    answer: String,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    citations: Vec<usize>,
}

/// Stage 4: synthesize the final answer from the analysis.
///
/// Citation numbers are validated against the run's source list; an
/// out-of-range number is dropped rather than failing the run. Like
/// Analyze, a dead provider here is terminal.
pub struct SummarizeStage {
    reasoner: Arc<dyn ReasoningProvider>,
}

impl SummarizeStage {
    pub fn new(reasoner: Arc<dyn ReasoningProvider>) -> Self {
        Self { reasoner }
    }

    pub async fn run(
        &self,
        raw_text: &str,
        analysis: &str,
        sources: &[Source],
    ) -> Result<Answer, ReasoningError> {
        let prompt = build_prompt(raw_text, analysis, sources);
        let reply = self
            .reasoner
            .generate(ModelRole::Reasoning, SYSTEM, &prompt)
            .await
            .inspect_err(|e| warn!(error = %e, "Summarize stage failed"))?;

        let parsed: SummaryReply = serde_json::from_str(&extract_json(&reply))
            .map_err(|e| ReasoningError::Parse(format!("summary reply: {}", e)))?;

        let citations = validate_citations(parsed.citations, sources.len());
        debug!(citations = citations.len(), "Synthesis complete");

        Ok(Answer {
            text: parsed.answer,
            key_points: parsed.key_points,
            citations,
            ungrounded: sources.is_empty(),
        })
    }
}

/// Keep citation numbers that point at an actual source ([1]-based),
/// preserving order and dropping repeats.
fn validate_citations(raw: Vec<usize>, source_count: usize) -> Vec<usize> {
    let mut citations = Vec::new();
    for citation in raw {
        if citation == 0 || citation > source_count {
            warn!(citation, source_count, "Dropping out-of-range citation");
        } else if !citations.contains(&citation) {
            citations.push(citation);
        }
    }
    citations
}

fn build_prompt(raw_text: &str, analysis: &str, sources: &[Source]) -> String {
    let numbered = if sources.is_empty() {
        "(none)".to_string()
    } else {
        sources
            .iter()
            .map(|s| format!("[{}] ({}) {}", s.rank, s.filename, s.text))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"Synthesize the final answer to the question below.

Question: {raw_text}

Analysis:
{analysis}

Sources:
{numbered}

Respond with JSON:
{{
  "answer": "<the final answer text>",
  "key_points": ["<short takeaways>"],
  "citations": [<bracketed source numbers the answer relies on>]
}}"#
    )
}
