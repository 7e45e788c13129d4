//! Fallback chain around the configured speech backend.

use super::SpeechSynthesizer;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Tries the primary backend, then the secondary, then gives up with empty audio.
///
/// Input longer than `max_chars` characters is cut to fit, ending in `...`.
pub struct FallbackSynthesizer {
    primary: Arc<dyn SpeechSynthesizer>,
    secondary: Option<Arc<dyn SpeechSynthesizer>>,
    max_chars: usize,
}

impl FallbackSynthesizer {
    pub fn new(
        primary: Arc<dyn SpeechSynthesizer>,
        secondary: Option<Arc<dyn SpeechSynthesizer>>,
        max_chars: usize,
    ) -> Self {
        Self {
            primary,
            secondary,
            max_chars,
        }
    }
}

/// Truncate to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_for_speech(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

#[async_trait]
impl SpeechSynthesizer for FallbackSynthesizer {
    async fn speak(&self, text: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let text = truncate_for_speech(text, self.max_chars);

        match self.primary.speak(&text).await {
            Ok(audio) => return Ok(audio),
            Err(e) => warn!(backend = self.primary.name(), error = %e, "Speech synthesis failed"),
        }

        if let Some(secondary) = &self.secondary {
            debug!(backend = secondary.name(), "Retrying speech with fallback backend");
            match secondary.speak(&text).await {
                Ok(audio) => return Ok(audio),
                Err(e) => warn!(backend = secondary.name(), error = %e, "Fallback speech failed"),
            }
        }

        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        self.primary.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::MockSpeechSynthesizer;

    #[test]
    fn test_truncate_for_speech() {
        assert_eq!(truncate_for_speech("short", 3000), "short");
        let long = "a".repeat(3005);
        let cut = truncate_for_speech(&long, 3000);
        assert_eq!(cut.chars().count(), 3000);
        assert!(cut.ends_with("..."));
        // Multi-byte characters are counted, not bytes.
        assert_eq!(truncate_for_speech("ééééé", 4), "é...");
    }

    #[tokio::test]
    async fn test_primary_success() {
        let primary = Arc::new(MockSpeechSynthesizer::new());
        let secondary = Arc::new(MockSpeechSynthesizer::new());
        let speech = FallbackSynthesizer::new(primary.clone(), Some(secondary.clone()), 3000);
        assert!(!speech.speak("hello").await.unwrap().is_empty());
        assert_eq!(primary.call_count(), 1);
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_secondary() {
        let primary = Arc::new(MockSpeechSynthesizer::failing());
        let secondary = Arc::new(MockSpeechSynthesizer::new());
        let speech = FallbackSynthesizer::new(primary.clone(), Some(secondary.clone()), 3000);
        let audio = speech.speak("hello").await.unwrap();
        assert_eq!(audio, secondary.speak("hello").await.unwrap());
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_all_failures_yield_empty_audio() {
        let speech = FallbackSynthesizer::new(
            Arc::new(MockSpeechSynthesizer::failing()),
            Some(Arc::new(MockSpeechSynthesizer::failing())),
            3000,
        );
        assert!(speech.speak("hello").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_long_text_is_truncated_before_synthesis() {
        let primary = Arc::new(MockSpeechSynthesizer::new());
        let speech = FallbackSynthesizer::new(primary.clone(), None, 10);
        speech.speak("a fairly long sentence").await.unwrap();
        assert_eq!(primary.last_text().as_deref(), Some("a fairl..."));
    }

    #[tokio::test]
    async fn test_blank_text_skips_backends() {
        let primary = Arc::new(MockSpeechSynthesizer::new());
        let speech = FallbackSynthesizer::new(primary.clone(), None, 3000);
        assert!(speech.speak("   ").await.unwrap().is_empty());
        assert_eq!(primary.call_count(), 0);
    }
}
