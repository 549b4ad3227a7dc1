//! Quiz types and parsing of model-produced quizzes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::QuizParseError;

/// A single quiz question.
///
/// Serializes to the flat shape clients expect:
/// `{"id", "type", "question", "options"?, "answer", "explanation"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    /// 1-based position within its quiz.
    pub id: u32,
    /// The question prompt.
    pub question: String,
    /// Why the answer is correct.
    pub explanation: String,
    /// Kind-specific fields.
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// The answer format of a [`Question`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum QuestionKind {
    /// Pick one of several options; `answer` is the text of the correct option.
    #[serde(rename = "multiple-choice")]
    MultipleChoice {
        /// The choices, in display order.
        options: Vec<String>,
        /// The correct option.
        answer: String,
    },
    /// Free-text answer.
    #[serde(rename = "short-answer")]
    ShortAnswer {
        /// The expected answer.
        answer: String,
    },
}

impl Question {
    /// The expected answer regardless of kind.
    pub fn answer(&self) -> &str {
        match &self.kind {
            QuestionKind::MultipleChoice { answer, .. } | QuestionKind::ShortAnswer { answer } => {
                answer
            }
        }
    }

    /// Whether this is a multiple-choice question.
    pub fn is_multiple_choice(&self) -> bool {
        matches!(self.kind, QuestionKind::MultipleChoice { .. })
    }
}

/// A generated quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quiz {
    /// What the quiz is about.
    pub topic: String,
    /// Questions in order, ids `1..=n`.
    pub questions: Vec<Question>,
}

/// Return the text between the first `[` and the last `]`, inclusive.
pub fn extract_json_array(output: &str) -> Option<&str> {
    let start = output.find('[')?;
    let end = output.rfind(']')?;
    if end <= start {
        return None;
    }
    Some(&output[start..=end])
}

#[derive(Deserialize)]
struct RawQuestion {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    question: String,
    #[serde(default)]
    options: Option<Vec<Value>>,
    #[serde(default)]
    answer: Option<Value>,
    #[serde(default)]
    explanation: Option<String>,
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

impl RawQuestion {
    fn into_question(self, id: u32) -> Option<Question> {
        let question = self.question.trim().to_string();
        if question.is_empty() {
            return None;
        }

        let options: Vec<String> = self
            .options
            .unwrap_or_default()
            .iter()
            .map(value_text)
            .filter(|o| !o.is_empty())
            .collect();
        let wants_short = self
            .kind
            .as_deref()
            .is_some_and(|k| k.to_ascii_lowercase().replace('_', "-").starts_with("short"));

        let kind = if !wants_short && options.len() >= 2 {
            // Models sometimes answer with the option index instead of its text.
            let answer = match &self.answer {
                Some(Value::Number(n)) => n
                    .as_u64()
                    .and_then(|i| options.get(i as usize).cloned())
                    .unwrap_or_else(|| n.to_string()),
                Some(other) => value_text(other),
                None => options[0].clone(),
            };
            QuestionKind::MultipleChoice { options, answer }
        } else {
            QuestionKind::ShortAnswer { answer: self.answer.as_ref().map(value_text).unwrap_or_default() }
        };

        Some(Question {
            id,
            question,
            explanation: self.explanation.unwrap_or_default().trim().to_string(),
            kind,
        })
    }
}

/// Parse the quiz a text model produced.
///
/// The first JSON array in `output` is parsed as a list of question objects.
/// Blank questions are dropped and the survivors are renumbered `1..=n`.
/// A question becomes multiple choice when it has at least two options and is
/// not explicitly marked short answer.
///
/// # Errors
///
/// Returns a [`QuizParseError`] if no array is found, it is not valid JSON of
/// the expected shape, or no usable question remains.
pub fn parse_quiz_output(output: &str) -> Result<Vec<Question>, QuizParseError> {
    let json = extract_json_array(output).ok_or(QuizParseError::NoJsonArray)?;
    let raw: Vec<RawQuestion> = serde_json::from_str(json)?;

    let questions: Vec<Question> = raw
        .into_iter()
        .filter_map(|q| q.into_question(0))
        .enumerate()
        .map(|(i, mut q)| {
            q.id = i as u32 + 1;
            q
        })
        .collect();

    if questions.is_empty() {
        return Err(QuizParseError::Empty);
    }
    Ok(questions)
}
