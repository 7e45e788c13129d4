//! Text generation providers.
//!
//! Defines the `TextGenerator` trait and concrete implementations for:
//! - OpenAI-compatible APIs (OpenAI, Azure, Ollama, vLLM, LM Studio)
//! - Google Gemini API
//! - A queue-driven mock for tests and offline runs
//!
//! Use `create_text_generator()` to bind the configured backend.

pub mod gemini;
pub mod mock;
pub mod openai;
mod sse;

use crate::config::{LlmConfig, RetryConfig};
use crate::error::{ConfigError, LlmError, Result};
use crate::types::Turn;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use gemini::GeminiGenerator;
pub use mock::MockTextGenerator;
pub use openai::OpenAiGenerator;

/// A finite, non-restartable sequence of generated text chunks.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Capability interface for text generation backends.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a full response for `prompt`, given prior conversation turns.
    ///
    /// Only `user` and `assistant` turns of `history` are forwarded.
    async fn generate(
        &self,
        prompt: &str,
        history: &[Turn],
        system_prompt: Option<&str>,
    ) -> Result<String>;

    /// Stream a response incrementally.
    ///
    /// Connection and authentication failures are reported by the returned
    /// `Result`; failures while reading the body arrive as stream items.
    async fn stream(
        &self,
        prompt: &str,
        history: &[Turn],
        system_prompt: Option<&str>,
    ) -> Result<TextStream>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Bind the text generator named by `config.provider`.
///
/// Fails with `ConfigError::UnknownProvider` for names no backend answers to.
/// Credentials are not checked here; the first call resolves them.
pub fn create_text_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>> {
    let generator: Arc<dyn TextGenerator> = match config.provider.to_lowercase().as_str() {
        "openai" => Arc::new(OpenAiGenerator::new(config)?),
        "gemini" | "google" => Arc::new(GeminiGenerator::new(config)?),
        "mock" => Arc::new(MockTextGenerator::new()),
        other => {
            return Err(ConfigError::UnknownProvider {
                capability: "LLM".to_string(),
                name: other.to_string(),
            }
            .into());
        }
    };
    for warning in config.validate() {
        tracing::warn!(provider = generator.name(), "{warning}");
    }
    Ok(generator)
}

/// Build the shared HTTP client for a backend with its request timeout.
pub(crate) fn http_client(timeout_secs: u64) -> std::result::Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("ferret/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ConfigError::Invalid {
            message: format!("Failed to create HTTP client: {e}"),
        })
}

/// Execute an async operation with exponential backoff retry on transient errors.
///
/// Retries on `LlmError::RateLimited` (respects `retry_after_secs`), `LlmError::Streaming`,
/// `LlmError::Connection`, and `LlmError::Timeout`. Permanent errors (auth, parse) return immediately.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation: F,
) -> std::result::Result<T, LlmError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, LlmError>>,
{
    let mut last_err = None;
    for attempt in 0..=config.max_retries {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if !is_retryable(&e) || attempt == config.max_retries {
                    return Err(e);
                }

                let backoff_ms = compute_backoff(config, attempt, &e);
                tracing::warn!(
                    attempt = attempt + 1,
                    max = config.max_retries,
                    backoff_ms = backoff_ms,
                    error = %e,
                    "Retrying after transient error"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| LlmError::Connection {
        message: "All retry attempts exhausted".to_string(),
    }))
}

/// Check if an error is retryable (transient).
pub fn is_retryable(err: &LlmError) -> bool {
    matches!(
        err,
        LlmError::RateLimited { .. }
            | LlmError::Streaming { .. }
            | LlmError::Connection { .. }
            | LlmError::Timeout { .. }
    )
}

/// Compute backoff delay, respecting rate limit retry-after hints.
fn compute_backoff(config: &RetryConfig, attempt: u32, err: &LlmError) -> u64 {
    if let LlmError::RateLimited { retry_after_secs } = err {
        let server_ms = retry_after_secs * 1000;
        let computed = compute_exponential_backoff(config, attempt);
        return server_ms.max(computed);
    }
    compute_exponential_backoff(config, attempt)
}

/// Exponential backoff with optional jitter.
fn compute_exponential_backoff(config: &RetryConfig, attempt: u32) -> u64 {
    let base = config.initial_backoff_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    let capped = base.min(config.max_backoff_ms as f64) as u64;
    if config.jitter {
        // Up to 25% jitter
        let jitter = (capped as f64 * 0.25 * rand::random::<f64>()) as u64;
        capped + jitter
    } else {
        capped
    }
}
