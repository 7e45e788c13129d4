//! Google Gemini API text generator.
//!
//! Key differences from OpenAI-compatible APIs:
//! - Auth via the `x-goog-api-key` header
//! - The system instruction and conversation history are folded into a
//!   single user prompt
//! - Streaming uses `:streamGenerateContent?alt=sse`

use super::{TextGenerator, TextStream, http_client, sse, with_retry};
use crate::config::{LlmConfig, RetryConfig, resolve_credential};
use crate::error::{ConfigError, LlmError, Result};
use crate::types::{Role, Turn, conversational_turns};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

/// The default Google Gemini API base URL.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini text generator.
pub struct GeminiGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    temperature: f32,
    max_tokens: Option<usize>,
    timeout_secs: u64,
    retry: RetryConfig,
}

impl GeminiGenerator {
    /// Create a new Gemini generator from configuration.
    ///
    /// The key named by `config.api_key_env` is read on the first request,
    /// not here.
    pub fn new(config: &LlmConfig) -> std::result::Result<Self, ConfigError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            api_key_env: config.api_key_env.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            retry: config.retry.clone(),
        })
    }

    /// Fold the system instruction and history into one prompt text.
    fn build_prompt(prompt: &str, history: &[Turn], system_prompt: Option<&str>) -> String {
        let mut text = String::new();
        if let Some(system) = system_prompt {
            text.push_str(&format!("System Instruction: {system}\n\n"));
        }

        let mut turns = conversational_turns(history).peekable();
        if turns.peek().is_some() {
            text.push_str("Conversation History:\n");
            for turn in turns {
                let speaker = match turn.role {
                    Role::Assistant => "Assistant",
                    _ => "User",
                };
                text.push_str(&format!("{speaker}: {}\n", turn.content));
            }
            text.push('\n');
        }

        text.push_str(&format!("User Query: {prompt}"));
        text
    }

    fn build_request_body(&self, prompt_text: &str) -> Value {
        let mut generation_config = json!({ "temperature": self.temperature });
        if let Some(max_tokens) = self.max_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt_text }] }],
            "generationConfig": generation_config,
        })
    }

    fn endpoint_url(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, method)
    }

    async fn post(
        &self,
        url: &str,
        api_key: &str,
        body: &Value,
    ) -> std::result::Result<reqwest::Response, LlmError> {
        debug!(url = %url, model = %self.model, "Sending Gemini request");
        let response = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body_text));
        }
        Ok(response)
    }

    /// Concatenate the text parts of the first candidate.
    fn candidate_text(body: &Value) -> Option<String> {
        let parts = body["candidates"].get(0)?["content"]["parts"].as_array()?;
        Some(
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect::<String>(),
        )
    }

    fn parse_response(body: &Value) -> std::result::Result<String, LlmError> {
        let candidates = body["candidates"]
            .as_array()
            .ok_or_else(|| LlmError::ResponseParse {
                message: "Missing 'candidates' array in response".to_string(),
            })?;
        if candidates.is_empty() {
            return Err(LlmError::ResponseParse {
                message: "Empty 'candidates' array in response".to_string(),
            });
        }
        // A candidate blocked by safety filters has no parts.
        Ok(Self::candidate_text(body).unwrap_or_default())
    }

    /// Map an HTTP status code to the appropriate `LlmError`.
    fn map_http_error(status: reqwest::StatusCode, body_text: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => LlmError::AuthFailed {
                provider: "Gemini".to_string(),
            },
            429 => LlmError::RateLimited {
                retry_after_secs: 30,
            },
            500..=599 => LlmError::Connection {
                message: format!("HTTP {} from Gemini API: {}", status, body_text),
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {} from Gemini API: {}", status, body_text),
            },
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(
        &self,
        prompt: &str,
        history: &[Turn],
        system_prompt: Option<&str>,
    ) -> Result<String> {
        let api_key = resolve_credential("gemini", self.api_key.as_deref(), &self.api_key_env)?;
        let body = self.build_request_body(&Self::build_prompt(prompt, history, system_prompt));
        let url = self.endpoint_url("generateContent");

        let text = with_retry(&self.retry, || async {
            let response = self.post(&url, &api_key, &body).await?;
            let json: Value = response.json().await.map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON: {e}"),
            })?;
            Self::parse_response(&json)
        })
        .await?;
        Ok(text)
    }

    async fn stream(
        &self,
        prompt: &str,
        history: &[Turn],
        system_prompt: Option<&str>,
    ) -> Result<TextStream> {
        let api_key = resolve_credential("gemini", self.api_key.as_deref(), &self.api_key_env)?;
        let body = self.build_request_body(&Self::build_prompt(prompt, history, system_prompt));
        let url = self.endpoint_url("streamGenerateContent?alt=sse");

        let response = with_retry(&self.retry, || self.post(&url, &api_key, &body)).await?;
        Ok(sse::text_stream(response, Self::candidate_text))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
