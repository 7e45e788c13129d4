//! Error types for the Ferret core library.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering text generation, speech, export, and configuration.

use crate::types::ExportFormat;
use std::path::PathBuf;

/// Top-level error type for the Ferret core library.
#[derive(Debug, thiserror::Error)]
pub enum FerretError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from text generation backends.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Streaming error: {message}")]
    Streaming { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

impl LlmError {
    /// Classify a `reqwest` transport error.
    pub fn from_transport(err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            LlmError::Timeout { timeout_secs }
        } else if err.is_connect() {
            LlmError::Connection {
                message: err.to_string(),
            }
        } else {
            LlmError::ApiRequest {
                message: format!("Request failed: {err}"),
            }
        }
    }
}

/// Errors from speech synthesis backends.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("Speech synthesis failed: {message}")]
    SynthesisFailed { message: String },

    #[error("Nothing to synthesize: text is empty")]
    EmptyText,
}

/// Errors from rendering or persisting an exported report.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to render {format}: {message}")]
    Render {
        format: ExportFormat,
        message: String,
    },

    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },
}

/// Errors from the configuration system and provider selection.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown {capability} provider: '{name}'")]
    UnknownProvider { capability: String, name: String },

    #[error("Missing credential for {provider}: set env var '{env_var}' or an inline api_key")]
    MissingCredential { provider: String, env_var: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// A type alias for results using the top-level `FerretError`.
pub type Result<T> = std::result::Result<T, FerretError>;
