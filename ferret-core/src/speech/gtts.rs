//! Key-less synthesis through the Google Translate TTS endpoint.
//!
//! The endpoint accepts at most 100 characters per request, so text is split
//! at word boundaries and the MP3 chunks are concatenated.

use super::{SpeechSynthesizer, read_audio};
use crate::config::SpeechConfig;
use crate::error::{ConfigError, Result, SpeechError};
use crate::providers::http_client;
use async_trait::async_trait;
use tracing::debug;

const TTS_URL: &str = "https://translate.google.com/translate_tts";
const MAX_CHUNK_CHARS: usize = 100;

pub struct GttsSynthesizer {
    client: reqwest::Client,
    language: String,
}

impl GttsSynthesizer {
    pub fn new(config: &SpeechConfig) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            language: config.language.clone(),
        })
    }

    fn chunk_url(&self, chunk: &str, idx: usize, total: usize) -> String {
        format!(
            "{TTS_URL}?ie=UTF-8&client=tw-ob&tl={}&q={}&total={total}&idx={idx}&textlen={}",
            urlencoding::encode(&self.language),
            urlencoding::encode(chunk),
            chunk.chars().count(),
        )
    }
}

/// Split text into chunks of at most `max_chars` characters at whitespace.
///
/// A single word longer than `max_chars` is split mid-word.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            chunks.push(word.drain(..max_chars).collect());
        }
        if word.is_empty() {
            continue;
        }

        let extra = if current.is_empty() { 0 } else { 1 };
        if current_len + extra + word.len() > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[async_trait]
impl SpeechSynthesizer for GttsSynthesizer {
    async fn speak(&self, text: &str) -> Result<Vec<u8>> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(SpeechError::EmptyText.into());
        }
        debug!(chunks = chunks.len(), "Requesting gTTS audio");

        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let sent = self
                .client
                .get(self.chunk_url(chunk, idx, chunks.len()))
                .header("Referer", "http://translate.google.com/")
                .send()
                .await;
            audio.extend(read_audio(sent).await?);
        }
        Ok(audio)
    }

    fn name(&self) -> &str {
        "gtts"
    }
}
