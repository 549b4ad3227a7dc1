//! Error types for the `studybuddy-rag` crate.

use thiserror::Error;

/// Errors that can occur in retrieval operations.
///
/// Only [`ValidationError`](RagError::ValidationError),
/// [`ExtractionError`](RagError::ExtractionError) and [`NotFound`](RagError::NotFound)
/// are meant to reach an end user. The remaining variants are absorbed by the
/// fallback layers or indicate a broken internal invariant.
#[derive(Debug, Error)]
pub enum RagError {
    /// The caller supplied unusable input (empty query, bad upload, ...).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Text could not be extracted from an uploaded document.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// The document parsed but contained no extractable text.
    #[error("No extractable text found in document")]
    NoExtractableText,

    /// Two vectors of different length were compared or stored.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The length the operation required.
        expected: usize,
        /// The length that was supplied.
        actual: usize,
    },

    /// A referenced document does not exist.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the ingestion or retrieval orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RagError {
    /// Whether this error is the caller's fault or a missing resource, and
    /// should therefore be reported as-is instead of degraded.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            RagError::ValidationError(_)
                | RagError::ExtractionError(_)
                | RagError::NoExtractableText
                | RagError::NotFound(_)
        )
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
