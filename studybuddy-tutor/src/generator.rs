//! Generator trait and its model-backed and resilient implementations.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use studybuddy_rag::SearchResult;
use tracing::{debug, warn};

use crate::canned::CannedGenerator;
use crate::error::{Result, TutorError};
use crate::model::TextModel;
use crate::prompt::{ChatTurn, chat_prompt, quiz_prompt};
use crate::quiz::{Question, parse_quiz_output};

/// Produces chat replies and quizzes from retrieved passages.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Answer `message` using `passages` and recent `history`.
    async fn chat_response(
        &self,
        message: &str,
        passages: &[SearchResult],
        history: &[ChatTurn],
    ) -> Result<String>;

    /// Write `num_questions` questions on `topic`, ids `1..=n`.
    async fn quiz(
        &self,
        topic: &str,
        passages: &[SearchResult],
        num_questions: usize,
    ) -> Result<Vec<Question>>;

    /// Generator name used in logs.
    fn name(&self) -> &str;
}

/// A [`Generator`] that prompts a [`TextModel`].
pub struct ModelGenerator {
    model: Arc<dyn TextModel>,
}

impl ModelGenerator {
    /// Wrap a text model.
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Generator for ModelGenerator {
    async fn chat_response(
        &self,
        message: &str,
        passages: &[SearchResult],
        history: &[ChatTurn],
    ) -> Result<String> {
        let prompt = chat_prompt(message, passages, history);
        let reply = self.model.generate(&prompt).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(TutorError::GenerationError {
                provider: self.model.name().to_string(),
                message: "empty reply".into(),
            });
        }
        Ok(reply.to_string())
    }

    async fn quiz(
        &self,
        topic: &str,
        passages: &[SearchResult],
        num_questions: usize,
    ) -> Result<Vec<Question>> {
        let prompt = quiz_prompt(topic, passages, num_questions);
        let output = self.model.generate(&prompt).await?;
        let mut questions = parse_quiz_output(&output)?;
        questions.truncate(num_questions);
        debug!(model = self.model.name(), count = questions.len(), "parsed model quiz");
        Ok(questions)
    }

    fn name(&self) -> &str {
        self.model.name()
    }
}

/// Wraps an optional primary generator and falls back to [`CannedGenerator`].
///
/// Blank messages and topics, and a zero question count, are rejected with
/// [`TutorError::ValidationError`] before any model is called. Every other
/// failure of the primary, including a timeout, is logged and answered by the
/// fallback, so callers always get a usable reply.
pub struct ResilientGenerator {
    primary: Option<Arc<dyn Generator>>,
    fallback: CannedGenerator,
    timeout: Duration,
}

impl ResilientGenerator {
    /// A generator that only uses the canned fallback until a primary is set.
    pub fn new(timeout: Duration) -> Self {
        Self { primary: None, fallback: CannedGenerator::new(), timeout }
    }

    /// Use `primary` first for every request.
    pub fn with_primary(mut self, primary: Arc<dyn Generator>) -> Self {
        self.primary = Some(primary);
        self
    }

    /// Whether a primary generator is configured.
    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }
}

#[async_trait]
impl Generator for ResilientGenerator {
    async fn chat_response(
        &self,
        message: &str,
        passages: &[SearchResult],
        history: &[ChatTurn],
    ) -> Result<String> {
        if message.trim().is_empty() {
            return Err(TutorError::ValidationError("message must not be empty".into()));
        }

        if let Some(primary) = &self.primary {
            match tokio::time::timeout(
                self.timeout,
                primary.chat_response(message, passages, history),
            )
            .await
            {
                Ok(Ok(reply)) => return Ok(reply),
                Ok(Err(e)) => {
                    warn!(provider = primary.name(), error = %e, "chat generation failed, using fallback");
                }
                Err(_) => {
                    warn!(provider = primary.name(), timeout = ?self.timeout, "chat generation timed out, using fallback");
                }
            }
        }
        self.fallback.chat_response(message, passages, history).await
    }

    async fn quiz(
        &self,
        topic: &str,
        passages: &[SearchResult],
        num_questions: usize,
    ) -> Result<Vec<Question>> {
        if topic.trim().is_empty() {
            return Err(TutorError::ValidationError("topic must not be empty".into()));
        }
        if num_questions == 0 {
            return Err(TutorError::ValidationError("num_questions must be at least 1".into()));
        }

        if let Some(primary) = &self.primary {
            match tokio::time::timeout(self.timeout, primary.quiz(topic, passages, num_questions))
                .await
            {
                Ok(Ok(questions)) if !questions.is_empty() => return Ok(questions),
                Ok(Ok(_)) => {
                    warn!(provider = primary.name(), "model returned no questions, using fallback");
                }
                Ok(Err(e)) => {
                    warn!(provider = primary.name(), error = %e, "quiz generation failed, using fallback");
                }
                Err(_) => {
                    warn!(provider = primary.name(), timeout = ?self.timeout, "quiz generation timed out, using fallback");
                }
            }
        }
        self.fallback.quiz(topic, passages, num_questions).await
    }

    fn name(&self) -> &str {
        self.primary.as_ref().map_or(self.fallback.name(), |p| p.name())
    }
}
