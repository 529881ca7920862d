//! Mock reasoning provider for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::ReasoningError;
use crate::provider::{ModelRole, ReasoningProvider};

/// Mock provider that generates deterministic completions.
///
/// Scripted responses (if any) are consumed first, in order. With an empty
/// script the mock inspects the prompt and fabricates a plausible structured
/// reply for whichever stage is calling, so a full pipeline run works out of
/// the box without API calls.
pub struct MockReasoner {
    script: Mutex<VecDeque<Result<String, String>>>,
    /// Prompts containing this marker always fail
    fail_marker: Option<String>,
    /// When set, every call fails
    fail_all: bool,
}

impl MockReasoner {
    /// Create a mock reasoner with default prompt-driven behavior.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fail_marker: None,
            fail_all: false,
        }
    }

    /// Create a mock reasoner that fails every call.
    pub fn failing() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fail_marker: None,
            fail_all: true,
        }
    }

    /// Fail any call whose prompt contains the given marker.
    pub fn with_failure_marker(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Queue a scripted response, consumed before default behavior.
    pub fn push_response(&self, response: impl Into<String>) {
        self.script.lock().unwrap().push_back(Ok(response.into()));
    }

    /// Queue a scripted failure.
    pub fn push_failure(&self, error: impl Into<String>) {
        self.script.lock().unwrap().push_back(Err(error.into()));
    }

    /// Default reply fabricated from the prompt shape.
    fn default_response(&self, prompt: &str) -> String {
        if prompt.contains("\"query_kind\"") {
            return r#"{"intent": "Answer the user's question", "entities": ["mock"], "query_kind": "factual"}"#
                .to_string();
        }

        if prompt.contains("\"overall_score\"") {
            return r#"{
                "overall_score": 4.2,
                "rationale": "Clear, grounded, and addresses the question.",
                "criteria": {
                    "accuracy": 4.5,
                    "completeness": 4.0,
                    "relevance": 4.5,
                    "clarity": 4.0,
                    "coherence": 4.0
                }
            }"#
            .to_string();
        }

        if prompt.contains("\"citations\"") {
            let citations = if prompt.contains("[1]") { "[1]" } else { "[]" };
            return format!(
                r#"{{
                    "answer": "Mock answer synthesized from the analysis.",
                    "key_points": ["Point one", "Point two"],
                    "citations": {citations}
                }}"#
            );
        }

        "Mock analysis of the question against the provided context.".to_string()
    }
}

impl Default for MockReasoner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReasoningProvider for MockReasoner {
    async fn generate(
        &self,
        _role: ModelRole,
        _system: &str,
        prompt: &str,
    ) -> Result<String, ReasoningError> {
        if self.fail_all {
            return Err(ReasoningError::Api("mock provider unavailable".to_string()));
        }
        if let Some(marker) = &self.fail_marker {
            if prompt.contains(marker.as_str()) {
                return Err(ReasoningError::Api(format!(
                    "mock failure triggered by marker {:?}",
                    marker
                )));
            }
        }

        if let Some(scripted) = self.script.lock().unwrap().pop_front() {
            return scripted.map_err(ReasoningError::Api);
        }

        Ok(self.default_response(prompt))
    }
}
