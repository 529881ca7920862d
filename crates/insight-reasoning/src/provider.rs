//! Reasoning provider trait and response helpers.

use async_trait::async_trait;

use crate::error::ReasoningError;

/// Which configured model a generation call should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// The main reasoning model (parse, analyze, summarize)
    Reasoning,
    /// The judge model (evaluate)
    Judge,
}

/// Narrow interface over a generative completion capability.
///
/// Implementations must be thread-safe and perform their own bounded
/// retry; an error from `generate` means retries are exhausted and the
/// calling stage should degrade or fail.
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Generate a completion for the given system and user prompts.
    async fn generate(
        &self,
        role: ModelRole,
        system: &str,
        prompt: &str,
    ) -> Result<String, ReasoningError>;
}

/// Extract a JSON object from model output (handles markdown code blocks).
pub fn extract_json(text: &str) -> String {
    // Check for markdown code block
    if let Some(start) = text.find("```json") {
        if let Some(end) = text[start + 7..].find("```") {
            return text[start + 7..start + 7 + end].trim().to_string();
        }
    }

    // Check for plain code block
    if let Some(start) = text.find("```") {
        if let Some(end) = text[start + 3..].find("```") {
            return text[start + 3..start + 3 + end].trim().to_string();
        }
    }

    // Find first { and last }
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        return text[start..=end].to_string();
    }

    text.to_string()
}
