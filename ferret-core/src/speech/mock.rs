//! Mock speech backend.

use super::SpeechSynthesizer;
use crate::error::{Result, SpeechError};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Deterministic speech backend for tests. Never touches the network.
pub struct MockSpeechSynthesizer {
    call_count: AtomicUsize,
    last_text: Mutex<Option<String>>,
    fail: bool,
}

impl MockSpeechSynthesizer {
    pub fn new() -> Self {
        Self {
            call_count: AtomicUsize::new(0),
            last_text: Mutex::new(None),
            fail: false,
        }
    }

    /// A mock whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Number of times `speak` was called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Text passed to the most recent call.
    pub fn last_text(&self) -> Option<String> {
        self.last_text
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for MockSpeechSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSpeechSynthesizer {
    async fn speak(&self, text: &str) -> Result<Vec<u8>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self
            .last_text
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(text.to_string());

        if self.fail {
            return Err(SpeechError::SynthesisFailed {
                message: "mock failure".to_string(),
            }
            .into());
        }
        if text.is_empty() {
            return Err(SpeechError::EmptyText.into());
        }
        // An ID3 tag header followed by the text keeps the output recognisable.
        let mut audio = b"ID3".to_vec();
        audio.extend_from_slice(text.as_bytes());
        Ok(audio)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
