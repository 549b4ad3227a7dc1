//! # studybuddy-tutor
//!
//! Generation core for StudyBuddy: chat replies and quizzes grounded in
//! retrieved passages.
//!
//! - [`Generator`] is the capability the server calls
//! - [`ModelGenerator`] prompts a [`TextModel`] and parses its output
//! - [`CannedGenerator`] is the offline fallback
//! - [`ResilientGenerator`] tries a primary generator under a timeout and
//!   falls back on any failure
//!
//! ```rust,ignore
//! use std::{sync::Arc, time::Duration};
//! use studybuddy_tutor::*;
//!
//! let generator = ResilientGenerator::new(Duration::from_secs(30))
//!     .with_primary(Arc::new(ModelGenerator::new(Arc::new(MockModel::new()))));
//! let reply = generator.chat_response("hello", &[], &[]).await?;
//! ```
//!
//! ## Features
//!
//! - `gemini`: [`gemini::GeminiTextModel`], backed by the Gemini REST API

pub mod canned;
pub mod error;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod generator;
pub mod mock;
pub mod model;
pub mod prompt;
pub mod quiz;

pub use canned::CannedGenerator;
pub use error::{QuizParseError, Result, TutorError};
#[cfg(feature = "gemini")]
pub use gemini::GeminiTextModel;
pub use generator::{Generator, ModelGenerator, ResilientGenerator};
pub use mock::MockModel;
pub use model::TextModel;
pub use prompt::{ChatRole, ChatTurn, HISTORY_TURNS, chat_prompt, quiz_prompt};
pub use quiz::{Question, QuestionKind, Quiz, extract_json_array, parse_quiz_output};
