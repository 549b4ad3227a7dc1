//! Prompt assembly for chat answers and quizzes.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use studybuddy_rag::SearchResult;

/// How many previous turns of conversation reach the prompt.
pub const HISTORY_TURNS: usize = 4;

/// Who said a line of conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The student.
    User,
    /// The tutor.
    #[serde(alias = "model", alias = "bot")]
    Assistant,
}

/// One line of earlier conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    /// Speaker of this turn.
    pub role: ChatRole,
    /// What was said.
    pub content: String,
}

impl ChatTurn {
    /// A turn spoken by the student.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    /// A turn spoken by the tutor.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

fn write_passages(prompt: &mut String, passages: &[SearchResult]) {
    if passages.is_empty() {
        prompt.push_str("No excerpts from the student's documents matched this request.\n");
        return;
    }
    prompt.push_str("Excerpts from the student's documents:\n");
    for (i, passage) in passages.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "[{}] ({}, page {}) {}",
            i + 1,
            passage.metadata.filename,
            passage.metadata.page,
            passage.text.trim()
        );
    }
}

/// Build the prompt for answering a student's message.
///
/// Passages are numbered `[1]`, `[2]`, ... so the model can cite them. Only the
/// last [`HISTORY_TURNS`] turns of `history` are included.
pub fn chat_prompt(message: &str, passages: &[SearchResult], history: &[ChatTurn]) -> String {
    let mut prompt = String::from(
        "You are StudyBuddy, a patient tutor helping a student understand their study material.\n\n",
    );
    write_passages(&mut prompt, passages);

    let recent = &history[history.len().saturating_sub(HISTORY_TURNS)..];
    if !recent.is_empty() {
        prompt.push_str("\nConversation so far:\n");
        for turn in recent {
            let speaker = match turn.role {
                ChatRole::User => "Student",
                ChatRole::Assistant => "Tutor",
            };
            let _ = writeln!(prompt, "{speaker}: {}", turn.content.trim());
        }
    }

    let _ = write!(
        prompt,
        "\nStudent: {}\n\n\
         Answer clearly and concisely. When an excerpt supports your answer, cite it as [n]. \
         If the excerpts do not cover the question, say so before answering from general knowledge.",
        message.trim()
    );
    prompt
}

/// Build the prompt asking for a quiz as a strict JSON array.
pub fn quiz_prompt(topic: &str, passages: &[SearchResult], num_questions: usize) -> String {
    let mut prompt = format!(
        "You are StudyBuddy, writing a {num_questions}-question quiz on \"{}\" for a student.\n\n",
        topic.trim()
    );
    write_passages(&mut prompt, passages);
    let _ = write!(
        prompt,
        "\nWrite exactly {num_questions} questions, mixing multiple-choice and short-answer. \
         Base them on the excerpts when available.\n\
         Respond with ONLY a JSON array, no prose and no markdown, where every element has this shape:\n\
         {{\"id\": 1, \"type\": \"multiple-choice\" | \"short-answer\", \"question\": \"...\", \
         \"options\": [\"...\", \"...\", \"...\", \"...\"], \"answer\": \"...\", \"explanation\": \"...\"}}\n\
         Include \"options\" only for multiple-choice questions, and make \"answer\" the exact text of the correct option."
    );
    prompt
}
