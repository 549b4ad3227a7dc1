//! Scripted text model for tests and offline demos.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, TutorError};
use crate::model::TextModel;

/// A [`TextModel`] that replays queued responses in order.
///
/// Each call pops the next response; `Err` entries are returned as
/// [`TutorError::GenerationError`]. Once the queue is empty every call fails.
/// Prompts are recorded for later inspection.
#[derive(Debug, Default)]
pub struct MockModel {
    responses: Mutex<VecDeque<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockModel {
    /// Create a mock with no queued responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue a failure.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()));
        self
    }

    fn push(&self, entry: std::result::Result<String, String>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(entry);
        }
    }

    /// Every prompt received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextModel for MockModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let next = self.responses.lock().ok().and_then(|mut r| r.pop_front());
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(TutorError::GenerationError { provider: "mock".into(), message }),
            None => Err(TutorError::GenerationError {
                provider: "mock".into(),
                message: "no scripted response left".into(),
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
