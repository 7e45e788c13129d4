//! OpenAI-compatible text generator.
//!
//! Supports OpenAI, Azure OpenAI, Ollama, vLLM, LM Studio, and any
//! endpoint that follows the OpenAI chat completions API format.

use super::{TextGenerator, TextStream, http_client, sse, with_retry};
use crate::config::{LlmConfig, RetryConfig, resolve_credential};
use crate::error::{ConfigError, LlmError, Result};
use crate::types::{Turn, conversational_turns};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat completions backend.
pub struct OpenAiGenerator {
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

impl OpenAiGenerator {
    /// Create a generator from configuration. The API key is resolved lazily.
    pub fn new(config: &LlmConfig) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            api_key_env: config.api_key_env.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            retry: config.retry.clone(),
        })
    }

    /// Local servers (Ollama, vLLM, LM Studio) run without authentication.
    fn is_local(&self) -> bool {
        self.base_url.contains("localhost") || self.base_url.contains("127.0.0.1")
    }

    fn api_key(&self) -> std::result::Result<String, ConfigError> {
        match resolve_credential("openai", self.api_key.as_deref(), &self.api_key_env) {
            Ok(key) => Ok(key),
            Err(_) if self.is_local() => {
                debug!("No API key set for local provider; using dummy bearer token");
                Ok("ollama".to_string())
            }
            Err(e) => Err(e),
        }
    }

    /// Build the chat message list: system prompt, forwarded history, then the prompt.
    fn build_messages(prompt: &str, history: &[Turn], system_prompt: Option<&str>) -> Vec<Value> {
        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            messages.push(json!({"role": "system", "content": system}));
        }
        for turn in conversational_turns(history) {
            messages.push(json!({"role": turn.role.to_string(), "content": turn.content}));
        }
        messages.push(json!({"role": "user", "content": prompt}));
        messages
    }

    fn request_body(&self, messages: Vec<Value>, stream: bool) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "stream": stream,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }

    async fn post(&self, api_key: &str, body: &Value) -> std::result::Result<reqwest::Response, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, model = %self.model, "Sending OpenAI completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
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

    /// Extract the assistant text from a chat completions response.
    fn parse_response(body: &Value) -> std::result::Result<String, LlmError> {
        let choice = body
            .get("choices")
            .and_then(|c| c.get(0))
            .ok_or_else(|| LlmError::ResponseParse {
                message: "No choices in response".to_string(),
            })?;
        Ok(choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string())
    }

    /// Extract the content delta from a streaming chunk.
    fn parse_delta(chunk: &Value) -> Option<String> {
        chunk
            .get("choices")?
            .get(0)?
            .get("delta")?
            .get("content")?
            .as_str()
            .map(str::to_string)
    }

    /// Map an HTTP status code to the appropriate LlmError.
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => {
                debug!(body = %body, "Authentication failed ({})", status);
                LlmError::AuthFailed {
                    provider: "OpenAI-compatible".to_string(),
                }
            }
            429 => {
                // "Rate limit reached ... Please try again in 20s."
                let retry_secs = serde_json::from_str::<Value>(body)
                    .ok()
                    .and_then(|v| {
                        v.get("error")?
                            .get("message")?
                            .as_str()
                            .map(|s| s.to_string())
                    })
                    .and_then(|msg| {
                        msg.split("in ")
                            .last()
                            .and_then(|s| s.trim_end_matches('.').trim_end_matches('s').parse::<u64>().ok())
                    })
                    .unwrap_or(5);
                LlmError::RateLimited {
                    retry_after_secs: retry_secs,
                }
            }
            status if status >= 500 => LlmError::Connection {
                message: format!("Server error ({status}): {body}"),
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {status}: {body}"),
            },
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        prompt: &str,
        history: &[Turn],
        system_prompt: Option<&str>,
    ) -> Result<String> {
        let api_key = self.api_key()?;
        let body = self.request_body(Self::build_messages(prompt, history, system_prompt), false);

        let text = with_retry(&self.retry, || async {
            let response = self.post(&api_key, &body).await?;
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
        let api_key = self.api_key()?;
        let body = self.request_body(Self::build_messages(prompt, history, system_prompt), true);
        let response = with_retry(&self.retry, || self.post(&api_key, &body)).await?;
        Ok(sse::text_stream(response, Self::parse_delta))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn test_config() -> LlmConfig {
        LlmConfig {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "FERRET_TEST_OPENAI_KEY".to_string(),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_build_messages_forwards_only_conversation() {
        let history = vec![
            Turn::user("Who is the president of France?"),
            Turn::assistant("Emmanuel Macron."),
            Turn::new(Role::Tool, "ignored"),
            Turn::new(Role::System, "ignored too"),
        ];
        let messages =
            OpenAiGenerator::build_messages("How old is he?", &history, Some("Be helpful"));
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "Be helpful");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["role"], "user");
        assert_eq!(messages[3]["content"], "How old is he?");
    }

    #[test]
    fn test_build_messages_without_system_prompt() {
        let messages = OpenAiGenerator::build_messages("Hi", &[], None);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }

    #[test]
    fn test_parse_text_response() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello!"}}]
        });
        assert_eq!(OpenAiGenerator::parse_response(&body).unwrap(), "Hello!");
    }

    #[test]
    fn test_parse_response_no_choices() {
        let body = json!({"choices": []});
        assert!(matches!(
            OpenAiGenerator::parse_response(&body),
            Err(LlmError::ResponseParse { .. })
        ));
    }

    #[test]
    fn test_parse_delta() {
        let chunk = json!({"choices": [{"delta": {"content": "Hel"}}]});
        assert_eq!(OpenAiGenerator::parse_delta(&chunk).as_deref(), Some("Hel"));
        let role_only = json!({"choices": [{"delta": {"role": "assistant"}}]});
        assert_eq!(OpenAiGenerator::parse_delta(&role_only), None);
    }

    #[test]
    fn test_http_error_mapping() {
        let err = OpenAiGenerator::map_http_error(reqwest::StatusCode::UNAUTHORIZED, "{}");
        assert!(matches!(err, LlmError::AuthFailed { .. }));

        let body = r#"{"error": {"message": "Rate limit reached. Please try again in 20s"}}"#;
        let err = OpenAiGenerator::map_http_error(reqwest::StatusCode::TOO_MANY_REQUESTS, body);
        assert!(matches!(
            err,
            LlmError::RateLimited {
                retry_after_secs: 20
            }
        ));

        let err =
            OpenAiGenerator::map_http_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(matches!(err, LlmError::Connection { .. }));

        let err = OpenAiGenerator::map_http_error(reqwest::StatusCode::BAD_REQUEST, "bad");
        assert!(matches!(err, LlmError::ApiRequest { .. }));
    }

    #[tokio::test]
    async fn test_missing_key_fails_at_first_call() {
        // SAFETY: test-only env var manipulation
        unsafe { std::env::remove_var("FERRET_TEST_OPENAI_KEY") };
        let generator = OpenAiGenerator::new(&test_config()).unwrap();
        let err = generator.generate("hi", &[], None).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::FerretError::Config(ConfigError::MissingCredential { .. })
        ));
    }

    #[test]
    fn test_local_provider_no_api_key_required() {
        let mut config = test_config();
        config.api_key_env = "FERRET_TEST_OPENAI_KEY_LOCAL".to_string();
        config.base_url = Some("http://localhost:11434/v1/".to_string());
        let generator = OpenAiGenerator::new(&config).unwrap();
        assert_eq!(generator.base_url, "http://localhost:11434/v1");
        assert_eq!(generator.api_key().unwrap(), "ollama");
    }
}
