//! Text-to-speech backends.
//!
//! Every backend returns MP3 bytes. The configured backend is always wrapped
//! in a [`FallbackSynthesizer`], so callers get audio or an empty buffer but
//! never an error from a failed synthesis.

pub mod elevenlabs;
pub mod fallback;
pub mod gtts;
pub mod mock;
pub mod openai;

use crate::config::SpeechConfig;
use crate::error::{Result, SpeechError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub use elevenlabs::ElevenLabsSynthesizer;
pub use fallback::FallbackSynthesizer;
pub use gtts::GttsSynthesizer;
pub use mock::MockSpeechSynthesizer;
pub use openai::OpenAiSpeechSynthesizer;

/// Capability interface for speech synthesis backends.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Convert text to MP3 audio.
    async fn speak(&self, text: &str) -> Result<Vec<u8>>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// A synthesizer that produces no audio. Selected with `provider = "none"`.
#[derive(Debug, Default)]
pub struct NoSpeech;

#[async_trait]
impl SpeechSynthesizer for NoSpeech {
    async fn speak(&self, _text: &str) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Bind the speech backend named by `config.provider`, wrapped in the fallback chain.
///
/// Unknown names are not fatal: they log a warning and use gTTS.
pub fn create_speech_synthesizer(config: &SpeechConfig) -> Result<Arc<dyn SpeechSynthesizer>> {
    let name = config.provider.to_lowercase();
    let primary: Arc<dyn SpeechSynthesizer> = match name.as_str() {
        "gtts" => Arc::new(GttsSynthesizer::new(config)?),
        "openai" => Arc::new(OpenAiSpeechSynthesizer::new(config)?),
        "elevenlabs" => Arc::new(ElevenLabsSynthesizer::new(config)?),
        "mock" => Arc::new(MockSpeechSynthesizer::new()),
        "none" => Arc::new(NoSpeech),
        other => {
            warn!(provider = other, "Unknown speech provider; using gtts");
            Arc::new(GttsSynthesizer::new(config)?)
        }
    };

    // Offline backends and gTTS itself get no second chance over the network.
    let secondary: Option<Arc<dyn SpeechSynthesizer>> = match primary.name() {
        "gtts" | "mock" | "none" => None,
        _ => Some(Arc::new(GttsSynthesizer::new(config)?)),
    };

    Ok(Arc::new(FallbackSynthesizer::new(
        primary,
        secondary,
        config.max_chars,
    )))
}

/// Read a successful audio response body, mapping failures to `SpeechError`.
pub(crate) async fn read_audio(
    sent: std::result::Result<reqwest::Response, reqwest::Error>,
) -> std::result::Result<Vec<u8>, SpeechError> {
    let response = sent.map_err(|e| SpeechError::SynthesisFailed {
        message: format!("HTTP request failed: {e}"),
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(SpeechError::SynthesisFailed {
            message: format!("API returned {status}: {body}"),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SpeechError::SynthesisFailed {
            message: format!("Failed to read response: {e}"),
        })?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_none_backend_is_silent() {
        let config = SpeechConfig {
            provider: "none".to_string(),
            ..SpeechConfig::default()
        };
        let speech = create_speech_synthesizer(&config).unwrap();
        assert!(speech.speak("Hello there").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_backend_through_factory() {
        let config = SpeechConfig {
            provider: "MOCK".to_string(),
            ..SpeechConfig::default()
        };
        let speech = create_speech_synthesizer(&config).unwrap();
        assert_eq!(speech.name(), "mock");
        assert!(!speech.speak("Hello").await.unwrap().is_empty());
    }

    #[test]
    fn test_unknown_provider_falls_back_to_gtts() {
        let config = SpeechConfig {
            provider: "polly".to_string(),
            ..SpeechConfig::default()
        };
        assert_eq!(create_speech_synthesizer(&config).unwrap().name(), "gtts");
    }

    #[test]
    fn test_factory_selection() {
        for name in ["gtts", "openai", "elevenlabs"] {
            let config = SpeechConfig {
                provider: name.to_string(),
                ..SpeechConfig::default()
            };
            assert_eq!(create_speech_synthesizer(&config).unwrap().name(), name);
        }
    }
}
