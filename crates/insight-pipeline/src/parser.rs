//! Parse stage: LLM extraction of intent, entities, and query kind.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use insight_reasoning::{extract_json, ModelRole, ReasoningProvider};
use insight_types::{ParsedQuery, QueryKind, StageStatus};

const SYSTEM: &str = "You extract structured search intent from user questions. \
Respond with JSON only, no prose.";

/// Wire shape of the model's parse reply
#[derive(Deserialize)]
struct ParseReply {
    intent: String,
    #[serde(default)]
    entities: Vec<String>,
    query_kind: QueryKind,
}

/// Stage 1: turn raw question text into a `ParsedQuery`.
///
/// A provider failure or malformed reply degrades to a generic factual
/// reading of the raw text with heuristically extracted entities.
pub struct ParseStage {
    reasoner: Arc<dyn ReasoningProvider>,
}

impl ParseStage {
    pub fn new(reasoner: Arc<dyn ReasoningProvider>) -> Self {
        Self { reasoner }
    }

    pub async fn run(&self, raw_text: &str) -> (ParsedQuery, StageStatus) {
        let prompt = build_prompt(raw_text);

        let reply = match self
            .reasoner
            .generate(ModelRole::Reasoning, SYSTEM, &prompt)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Parse stage falling back to raw-text treatment");
                return (fallback_parse(raw_text), StageStatus::Degraded);
            }
        };

        match serde_json::from_str::<ParseReply>(&extract_json(&reply)) {
            Ok(parsed) => {
                debug!(kind = %parsed.query_kind, entities = parsed.entities.len(), "Parsed query");
                (
                    ParsedQuery {
                        intent: parsed.intent,
                        entities: parsed.entities,
                        kind: parsed.query_kind,
                    },
                    StageStatus::Completed,
                )
            }
            Err(e) => {
                warn!(error = %e, "Malformed parse reply, falling back");
                (fallback_parse(raw_text), StageStatus::Degraded)
            }
        }
    }
}

fn build_prompt(raw_text: &str) -> String {
    format!(
        r#"Parse the user question below into search intent.

Question: {raw_text}

Respond with JSON:
{{
  "intent": "<what the user wants to accomplish>",
  "entities": ["<named entities, key terms, dates, metrics>"],
  "query_kind": "<one of: factual, comparison, summary, analytical, general>"
}}"#
    )
}

/// Degraded parse: factual treatment of the raw text plus token
/// heuristics for entities (capitalized words and number-bearing
/// tokens, which tend to be the terms worth boosting in retrieval).
fn fallback_parse(raw_text: &str) -> ParsedQuery {
    let mut parsed = ParsedQuery::fallback(raw_text);
    parsed.entities = fallback_entities(raw_text);
    parsed
}

fn fallback_entities(raw_text: &str) -> Vec<String> {
    let mut entities: Vec<String> = Vec::new();
    for token in raw_text.split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_alphanumeric());
        if token.len() < 2 {
            continue;
        }
        let interesting = token.chars().next().is_some_and(|c| c.is_uppercase())
            || token.chars().any(|c| c.is_ascii_digit());
        if interesting && !entities.iter().any(|e| e == token) {
            entities.push(token.to_string());
        }
    }
    entities.truncate(8);
    entities
}
