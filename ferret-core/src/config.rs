//! Configuration system for Ferret.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/ferret/config.toml` and/or `.ferret/config.toml`
//! in the workspace directory.
//!
//! Credentials are never validated here. Each backend resolves its key on the
//! first call that needs it (see [`resolve_credential`]).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FerretConfig {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub speech: SpeechConfig,
    pub report: ReportConfig,
}

/// Text generation backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name: "gemini" (alias "google"), "openai", or "mock".
    pub provider: String,
    /// Model identifier (e.g., "gemini-2.5-flash", "gpt-4o").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Inline API key. Takes precedence over `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate in a response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    /// Per-request network timeout.
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: None,
            timeout_secs: 60,
            retry: RetryConfig::default(),
        }
    }
}

impl LlmConfig {
    /// Validate this LLM config and return any warnings.
    ///
    /// Returns an empty Vec if the config is valid. Problematic values produce
    /// human-readable warnings rather than errors.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.temperature < 0.0 || self.temperature > 2.0 {
            warnings.push(format!(
                "temperature ({}) is outside the typical range 0.0–2.0",
                self.temperature
            ));
        }
        if self.timeout_secs == 0 {
            warnings.push("timeout_secs is 0; every request will time out".to_string());
        }
        if self.model.trim().is_empty() {
            warnings.push("model is empty; the provider default will be rejected".to_string());
        }
        warnings
    }
}

/// Retry policy for transient text generation failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds.
    pub initial_backoff_ms: u64,
    /// Upper bound for a single backoff delay in milliseconds.
    pub max_backoff_ms: u64,
    /// Multiplier applied per attempt.
    pub backoff_multiplier: f64,
    /// Add up to 25% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Search backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Provider name: "serper", "tavily", "duckduckgo", or "mock".
    pub provider: String,
    /// Environment variable holding the key; each backend has its own default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Maximum results requested per query.
    pub max_results: usize,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: "serper".to_string(),
            api_key_env: None,
            api_key: None,
            max_results: 10,
            timeout_secs: 10,
        }
    }
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Provider name: "gtts", "openai", "elevenlabs", "mock", or "none".
    /// Unknown names fall back to "gtts".
    pub provider: String,
    /// Environment variable holding the key; each backend has its own default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Voice name or id; backend default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    /// Language code for key-less synthesis.
    pub language: String,
    /// Text longer than this is truncated before synthesis.
    pub max_chars: usize,
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            provider: "gtts".to_string(),
            api_key_env: None,
            api_key: None,
            voice: None,
            language: "en".to_string(),
            max_chars: 3000,
            timeout_secs: 30,
        }
    }
}

/// Report export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory that receives exported files. Created on first write.
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
        }
    }
}

/// Resolve a backend credential: inline key first, then the named env var.
///
/// Empty values count as missing.
pub fn resolve_credential(
    provider: &str,
    inline: Option<&str>,
    env_var: &str,
) -> Result<String, ConfigError> {
    if let Some(key) = inline.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }
    std::env::var(env_var)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingCredential {
            provider: provider.to_string(),
            env_var: env_var.to_string(),
        })
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `FERRET_`)
/// 3. Workspace-local config (`.ferret/config.toml`)
/// 4. User config (`~/.config/ferret/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&FerretConfig>,
) -> Result<FerretConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(FerretConfig::default()));

    if let Some(config_dir) = directories::ProjectDirs::from("dev", "ferret", "ferret") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".ferret").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // FERRET_LLM__PROVIDER, FERRET_REPORT__OUTPUT_DIR, etc.
    figment = figment.merge(Env::prefixed("FERRET_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Render a configuration as pretty TOML, with inline keys masked.
pub fn to_masked_toml(config: &FerretConfig) -> Result<String, toml::ser::Error> {
    let mut masked = config.clone();
    for key in [
        &mut masked.llm.api_key,
        &mut masked.search.api_key,
        &mut masked.speech.api_key,
    ] {
        if key.is_some() {
            *key = Some("********".to_string());
        }
    }
    toml::to_string_pretty(&masked)
}
