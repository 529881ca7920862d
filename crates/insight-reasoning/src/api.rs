//! API-based reasoning provider using OpenAI-compatible or Anthropic endpoints.

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::ReasoningError;
use crate::provider::{ModelRole, ReasoningProvider};

/// Configuration for the API reasoning provider.
#[derive(Debug, Clone)]
pub struct ApiReasonerConfig {
    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    /// Model for parse/analyze/summarize calls
    pub model: String,

    /// Model for judge calls
    pub evaluation_model: String,

    /// API key
    pub api_key: SecretString,

    /// Request timeout
    pub timeout: Duration,

    /// Maximum attempts per call
    pub max_retries: u32,
}

impl ApiReasonerConfig {
    /// Create config for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            evaluation_model: "gpt-4o-mini".to_string(),
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(60),
            max_retries: 3,
        }
    }

    /// Create config for the Claude API.
    pub fn claude(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            base_url: "https://api.anthropic.com/v1".to_string(),
            evaluation_model: model.clone(),
            model,
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(60),
            max_retries: 3,
        }
    }

    /// Use a different model for judge calls.
    pub fn with_evaluation_model(mut self, model: impl Into<String>) -> Self {
        self.evaluation_model = model.into();
        self
    }

    fn model_for(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Reasoning => &self.model,
            ModelRole::Judge => &self.evaluation_model,
        }
    }
}

/// Reasoning provider backed by an HTTP completion endpoint.
pub struct ApiReasoner {
    client: Client,
    config: ApiReasonerConfig,
}

impl ApiReasoner {
    /// Create a new API reasoner.
    pub fn new(config: ApiReasonerConfig) -> Result<Self, ReasoningError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ReasoningError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Call the API with retry logic.
    async fn call_api(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
    ) -> Result<String, ReasoningError> {
        let mut backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(120)),
            ..Default::default()
        };

        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(attempt = attempts, model = %model, "Calling reasoning API");

            match self.make_request(model, system, prompt).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if attempts >= self.config.max_retries {
                        error!(error = %e, "Max retries exceeded");
                        return Err(e);
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                error = %e,
                                retry_in_ms = duration.as_millis(),
                                "Reasoning call failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(error = %e, "Backoff exhausted");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    /// Make a single API request, dispatching on endpoint flavor.
    async fn make_request(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
    ) -> Result<String, ReasoningError> {
        if self.config.base_url.contains("anthropic") {
            self.make_anthropic_request(model, system, prompt).await
        } else {
            self.make_openai_request(model, system, prompt).await
        }
    }

    /// Make OpenAI-compatible chat completion request.
    async fn make_openai_request(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
    ) -> Result<String, ReasoningError> {
        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            model: &'a str,
            messages: Vec<OpenAIMessage<'a>>,
            temperature: f32,
        }

        #[derive(Serialize)]
        struct OpenAIMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            choices: Vec<OpenAIChoice>,
        }

        #[derive(Deserialize)]
        struct OpenAIChoice {
            message: OpenAIResponseMessage,
        }

        #[derive(Deserialize)]
        struct OpenAIResponseMessage {
            content: String,
        }

        let request = OpenAIRequest {
            model,
            messages: vec![
                OpenAIMessage {
                    role: "system",
                    content: system,
                },
                OpenAIMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.1,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| ReasoningError::Api(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ReasoningError::Api(format!("HTTP {}: {}", status, body)));
        }

        let response_body: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::Parse(e.to_string()))?;

        response_body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ReasoningError::Parse("No choices in response".to_string()))
    }

    /// Make Anthropic messages request.
    async fn make_anthropic_request(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
    ) -> Result<String, ReasoningError> {
        #[derive(Serialize)]
        struct AnthropicRequest<'a> {
            model: &'a str,
            max_tokens: u32,
            system: &'a str,
            messages: Vec<AnthropicMessage<'a>>,
        }

        #[derive(Serialize)]
        struct AnthropicMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicContent>,
        }

        #[derive(Deserialize)]
        struct AnthropicContent {
            text: String,
        }

        let request = AnthropicRequest {
            model,
            max_tokens: 4096,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", self.config.base_url))
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| ReasoningError::Api(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ReasoningError::Api(format!("HTTP {}: {}", status, body)));
        }

        let response_body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::Parse(e.to_string()))?;

        response_body
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| ReasoningError::Parse("No content in response".to_string()))
    }
}

#[async_trait]
impl ReasoningProvider for ApiReasoner {
    async fn generate(
        &self,
        role: ModelRole,
        system: &str,
        prompt: &str,
    ) -> Result<String, ReasoningError> {
        let model = self.config.model_for(role).to_string();
        self.call_api(&model, system, prompt).await
    }
}
