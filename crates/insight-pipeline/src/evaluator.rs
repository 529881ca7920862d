//! Evaluate stage: LLM-as-judge scoring of a finished answer.

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use insight_reasoning::{extract_json, ModelRole, ReasoningError, ReasoningProvider};
use insight_types::{Answer, CriterionScores, Evaluation, Source};

const SYSTEM: &str = "You are a strict quality judge for document Q&A answers. \
Score on a 0-5 scale. Respond with JSON only.";

/// Wire shape of the judge's reply
#[derive(Deserialize)]
struct JudgeReply {
    overall_score: f32,
    #[serde(default)]
    rationale: String,
    criteria: CriterionScores,
}

/// Stage 5: score the answer against the question and its sources.
///
/// Runs in-line at the end of a pipeline run and standalone for
/// re-evaluation of a stored run. There is no fabricated fallback
/// score: a dead judge means no evaluation.
pub struct EvaluateStage {
    reasoner: Arc<dyn ReasoningProvider>,
}

impl EvaluateStage {
    pub fn new(reasoner: Arc<dyn ReasoningProvider>) -> Self {
        Self { reasoner }
    }

    pub async fn run(
        &self,
        raw_text: &str,
        answer: &Answer,
        sources: &[Source],
    ) -> Result<Evaluation, ReasoningError> {
        let prompt = build_prompt(raw_text, answer, sources);
        let reply = self
            .reasoner
            .generate(ModelRole::Judge, SYSTEM, &prompt)
            .await
            .inspect_err(|e| warn!(error = %e, "Evaluate stage failed"))?;

        let parsed: JudgeReply = serde_json::from_str(&extract_json(&reply))
            .map_err(|e| ReasoningError::Parse(format!("judge reply: {}", e)))?;

        let evaluation = Evaluation {
            score: parsed.overall_score.clamp(0.0, 5.0),
            criteria: parsed.criteria.clamped(),
            rationale: parsed.rationale,
            evaluated_at: Utc::now(),
        };
        debug!(score = evaluation.score, "Evaluation complete");
        Ok(evaluation)
    }
}

fn build_prompt(raw_text: &str, answer: &Answer, sources: &[Source]) -> String {
    let evidence = if sources.is_empty() {
        "(the answer was produced without document evidence)".to_string()
    } else {
        sources
            .iter()
            .map(|s| format!("[{}] {}", s.rank, s.text))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"Judge the answer below.

Question: {raw_text}

Answer: {answer_text}

Evidence:
{evidence}

Respond with JSON:
{{
  "overall_score": <0-5>,
  "rationale": "<one or two sentences>",
  "criteria": {{
    "accuracy": <0-5>,
    "completeness": <0-5>,
    "relevance": <0-5>,
    "clarity": <0-5>,
    "coherence": <0-5>
  }}
}}"#,
        answer_text = answer.text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_reasoning::MockReasoner;

    fn answer() -> Answer {
        Answer {
            text: "Revenue grew eight percent.".to_string(),
            key_points: vec!["growth".to_string()],
            citations: vec![1],
            ungrounded: false,
        }
    }

    #[tokio::test]
    async fn test_default_judge_scores_in_range() {
        let stage = EvaluateStage::new(Arc::new(MockReasoner::new()));
        let evaluation = stage.run("what was revenue", &answer(), &[]).await.unwrap();
        assert!((0.0..=5.0).contains(&evaluation.score));
        assert!(!evaluation.rationale.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_scale_scores_clamped() {
        let mock = MockReasoner::new();
        mock.push_response(
            r#"{"overall_score": 9.3, "rationale": "r", "criteria":
                {"accuracy": 7.0, "completeness": -1.0, "relevance": 4.0,
                 "clarity": 4.0, "coherence": 4.0}}"#,
        );
        let stage = EvaluateStage::new(Arc::new(mock));
        let evaluation = stage.run("q", &answer(), &[]).await.unwrap();
        assert_eq!(evaluation.score, 5.0);
        assert_eq!(evaluation.criteria.accuracy, 5.0);
        assert_eq!(evaluation.criteria.completeness, 0.0);
    }

    #[tokio::test]
    async fn test_dead_judge_is_an_error() {
        let stage = EvaluateStage::new(Arc::new(MockReasoner::failing()));
        assert!(stage.run("q", &answer(), &[]).await.is_err());
    }
}
