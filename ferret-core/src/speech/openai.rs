//! OpenAI `/audio/speech` backend.

use super::{SpeechSynthesizer, read_audio};
use crate::config::{SpeechConfig, resolve_credential};
use crate::error::{ConfigError, Result, SpeechError};
use crate::providers::http_client;
use async_trait::async_trait;
use serde_json::{Value, json};

const BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_VOICE: &str = "alloy";
const MODEL: &str = "tts-1";

pub struct OpenAiSpeechSynthesizer {
    client: reqwest::Client,
    api_key: Option<String>,
    api_key_env: String,
    voice: String,
}

impl OpenAiSpeechSynthesizer {
    pub fn new(config: &SpeechConfig) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key: config.api_key.clone(),
            api_key_env: config
                .api_key_env
                .clone()
                .unwrap_or_else(|| DEFAULT_KEY_ENV.to_string()),
            voice: config
                .voice
                .clone()
                .unwrap_or_else(|| DEFAULT_VOICE.to_string()),
        })
    }

    fn request_body(&self, text: &str) -> Value {
        json!({
            "model": MODEL,
            "input": text,
            "voice": self.voice,
            "response_format": "mp3",
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeechSynthesizer {
    async fn speak(&self, text: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText.into());
        }
        let api_key =
            resolve_credential("openai speech", self.api_key.as_deref(), &self.api_key_env)?;

        let sent = self
            .client
            .post(format!("{BASE_URL}/audio/speech"))
            .bearer_auth(api_key)
            .json(&self.request_body(text))
            .send()
            .await;
        Ok(read_audio(sent).await?)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
