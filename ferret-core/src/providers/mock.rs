//! A scripted text generator for tests and offline runs.

use super::{TextGenerator, TextStream};
use crate::error::{LlmError, Result};
use crate::types::Turn;
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// One recorded call to the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub prompt: String,
    pub history: Vec<Turn>,
    pub system_prompt: Option<String>,
}

/// A mock text generator.
///
/// Replies are taken from a FIFO queue; once it is empty every call answers
/// `"Mock response to: {prompt}"`.
pub struct MockTextGenerator {
    replies: Mutex<VecDeque<std::result::Result<String, LlmError>>>,
    calls: Mutex<Vec<MockCall>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTextGenerator {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that answers the next calls with `responses`, in order.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let generator = Self::new();
        for response in responses {
            generator.queue_response(response);
        }
        generator
    }

    /// Queue a reply for the next call.
    pub fn queue_response(&self, response: impl Into<String>) {
        locked(&self.replies).push_back(Ok(response.into()));
    }

    /// Queue a failure for the next call.
    pub fn queue_error(&self, error: LlmError) {
        locked(&self.replies).push_back(Err(error));
    }

    /// All calls made so far, oldest first.
    pub fn calls(&self) -> Vec<MockCall> {
        locked(&self.calls).clone()
    }

    /// Prompts of all calls made so far.
    pub fn prompts(&self) -> Vec<String> {
        locked(&self.calls).iter().map(|c| c.prompt.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        locked(&self.calls).len()
    }

    fn next_reply(
        &self,
        prompt: &str,
        history: &[Turn],
        system_prompt: Option<&str>,
    ) -> std::result::Result<String, LlmError> {
        locked(&self.calls).push(MockCall {
            prompt: prompt.to_string(),
            history: history.to_vec(),
            system_prompt: system_prompt.map(str::to_string),
        });
        locked(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Ok(format!("Mock response to: {prompt}")))
    }
}

impl Default for MockTextGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate(
        &self,
        prompt: &str,
        history: &[Turn],
        system_prompt: Option<&str>,
    ) -> Result<String> {
        Ok(self.next_reply(prompt, history, system_prompt)?)
    }

    async fn stream(
        &self,
        prompt: &str,
        history: &[Turn],
        system_prompt: Option<&str>,
    ) -> Result<TextStream> {
        let text = self.next_reply(prompt, history, system_prompt)?;
        // Word-sized chunks, whitespace kept, so the pieces concatenate back.
        let chunks: Vec<Result<String>> = text
            .split_inclusive(' ')
            .map(|chunk| Ok(chunk.to_string()))
            .collect();
        Ok(futures::stream::iter(chunks).boxed())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
