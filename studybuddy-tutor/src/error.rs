//! Error types for the `studybuddy-tutor` crate.

use thiserror::Error;

/// Reasons a model's quiz output could not be turned into questions.
#[derive(Debug, Error)]
pub enum QuizParseError {
    /// No `[` ... `]` pair was found in the output.
    #[error("no JSON array found in model output")]
    NoJsonArray,

    /// The bracketed text was not a valid array of questions.
    #[error("invalid quiz JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The array parsed but held no usable question.
    #[error("quiz contained no usable questions")]
    Empty,
}

/// Errors that can occur while generating answers or quizzes.
#[derive(Debug, Error)]
pub enum TutorError {
    /// The caller supplied an empty message or topic, or an impossible count.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The text model failed or returned nothing usable.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The model answered but its quiz could not be parsed.
    #[error("Quiz parse error: {0}")]
    QuizParse(#[from] QuizParseError),
}

/// A convenience result type for generation operations.
pub type Result<T> = std::result::Result<T, TutorError>;
