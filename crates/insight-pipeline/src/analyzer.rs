//! Analyze stage: reason over the retrieved sources.

use std::sync::Arc;
use tracing::{debug, warn};

use insight_reasoning::{ModelRole, ReasoningError, ReasoningProvider};
use insight_types::{ParsedQuery, Source};

const SYSTEM: &str = "You are an analyst. Work strictly from the provided context \
when context is given; say so when the context does not contain the answer.";

/// Stage 3: free-form analysis of the question against the sources.
///
/// No fallback exists for a dead reasoning provider, so an error here
/// is terminal for the run; the caller keeps the partial results.
pub struct AnalyzeStage {
    reasoner: Arc<dyn ReasoningProvider>,
}

impl AnalyzeStage {
    pub fn new(reasoner: Arc<dyn ReasoningProvider>) -> Self {
        Self { reasoner }
    }

    pub async fn run(
        &self,
        raw_text: &str,
        parsed: &ParsedQuery,
        sources: &[Source],
    ) -> Result<String, ReasoningError> {
        let prompt = build_prompt(raw_text, parsed, sources);
        let analysis = self
            .reasoner
            .generate(ModelRole::Reasoning, SYSTEM, &prompt)
            .await
            .inspect_err(|e| warn!(error = %e, "Analyze stage failed"))?;
        debug!(chars = analysis.len(), "Analysis complete");
        Ok(analysis)
    }
}

fn build_prompt(raw_text: &str, parsed: &ParsedQuery, sources: &[Source]) -> String {
    let context = if sources.is_empty() {
        "No document context was retrieved. Answer from general knowledge \
and state clearly that the answer is not grounded in the uploaded documents."
            .to_string()
    } else {
        sources
            .iter()
            .map(|s| format!("[{}] ({}) {}", s.rank, s.filename, s.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        r#"Analyze the question against the context below.

Question: {raw_text}
Intent: {intent}
Kind: {kind}

Context:
{context}

Write a focused analysis of what the context says about the question,
noting agreements, conflicts, and gaps."#,
        intent = parsed.intent,
        kind = parsed.kind,
    )
}
