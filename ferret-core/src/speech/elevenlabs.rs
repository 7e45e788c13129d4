//! ElevenLabs text-to-speech backend.

use super::{SpeechSynthesizer, read_audio};
use crate::config::{SpeechConfig, resolve_credential};
use crate::error::{ConfigError, Result, SpeechError};
use crate::providers::http_client;
use async_trait::async_trait;
use serde_json::json;

const BASE_URL: &str = "https://api.elevenlabs.io/v1";
const DEFAULT_KEY_ENV: &str = "ELEVENLABS_API_KEY";
/// "Adam", a stable deep male voice.
const DEFAULT_VOICE_ID: &str = "Wq15xSaY3gWvazBRaGEU";
const MODEL_ID: &str = "eleven_multilingual_v2";
const OUTPUT_FORMAT: &str = "mp3_44100_128";

pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    api_key: Option<String>,
    api_key_env: String,
    voice_id: String,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: &SpeechConfig) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key: config.api_key.clone(),
            api_key_env: config
                .api_key_env
                .clone()
                .unwrap_or_else(|| DEFAULT_KEY_ENV.to_string()),
            voice_id: config
                .voice
                .clone()
                .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
        })
    }

    fn endpoint_url(&self) -> String {
        format!(
            "{BASE_URL}/text-to-speech/{}?output_format={OUTPUT_FORMAT}",
            urlencoding::encode(&self.voice_id)
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn speak(&self, text: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText.into());
        }
        let api_key = resolve_credential("elevenlabs", self.api_key.as_deref(), &self.api_key_env)?;

        let sent = self
            .client
            .post(self.endpoint_url())
            .header("xi-api-key", api_key)
            .header("Accept", "audio/mpeg")
            .json(&json!({ "text": text, "model_id": MODEL_ID }))
            .send()
            .await;
        Ok(read_audio(sent).await?)
    }

    fn name(&self) -> &str {
        "elevenlabs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_default_voice() {
        let speech = ElevenLabsSynthesizer::new(&SpeechConfig::default()).unwrap();
        assert_eq!(
            speech.endpoint_url(),
            "https://api.elevenlabs.io/v1/text-to-speech/Wq15xSaY3gWvazBRaGEU?output_format=mp3_44100_128"
        );
        assert_eq!(speech.api_key_env, "ELEVENLABS_API_KEY");
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let speech = ElevenLabsSynthesizer::new(&SpeechConfig::default()).unwrap();
        assert!(matches!(
            speech.speak(" ").await,
            Err(crate::error::FerretError::Speech(SpeechError::EmptyText))
        ));
    }
}
