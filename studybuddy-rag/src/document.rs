//! Data types for documents, vector records, and search results.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Descriptive fields for an ingested document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Original filename of the upload.
    pub filename: String,
    /// When the upload was received.
    pub uploaded_at: DateTime<Utc>,
    /// Number of chunks the document was split into.
    pub num_chunks: usize,
    /// Number of pages reported by the extractor.
    pub num_pages: usize,
    /// Where the uploaded bytes are kept.
    pub source_path: PathBuf,
}

/// A document registered in the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique identifier generated at ingestion time.
    pub id: String,
    /// Descriptive fields supplied at registration.
    #[serde(flatten)]
    pub metadata: DocumentMetadata,
    /// When the store registered (or last re-registered) this document.
    pub created_at: DateTime<Utc>,
}

/// Per-chunk fields denormalized from the parent document for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Filename of the parent document.
    pub filename: String,
    /// Estimated originating page, see [`estimate_page`].
    pub page: usize,
    /// Total pages of the parent document.
    pub total_pages: usize,
}

/// A chunk of a document together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VectorRecord {
    /// Unique identifier, `{document_id}_{chunk_index}`.
    pub id: String,
    /// The ID of the owning [`Document`].
    pub document_id: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// The text content of the chunk.
    pub text: String,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
    /// Display metadata.
    pub metadata: ChunkMetadata,
}

impl VectorRecord {
    /// Build the record ID for a chunk of a document.
    pub fn record_id(document_id: &str, chunk_index: usize) -> String {
        format!("{document_id}_{chunk_index}")
    }
}

/// A retrieved chunk paired with its similarity to the query.
///
/// The embedding is deliberately absent; callers only ever need the text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// ID of the matched [`VectorRecord`].
    pub id: String,
    /// The ID of the owning [`Document`].
    pub document_id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
    /// Display metadata.
    pub metadata: ChunkMetadata,
    /// Cosine similarity to the query, higher is more relevant.
    pub similarity: f32,
}

impl SearchResult {
    pub(crate) fn from_record(record: &VectorRecord, similarity: f32) -> Self {
        Self {
            id: record.id.clone(),
            document_id: record.document_id.clone(),
            text: record.text.clone(),
            chunk_index: record.chunk_index,
            metadata: record.metadata.clone(),
            similarity,
        }
    }
}

/// Counters describing the store's contents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Number of vector records held.
    pub total_vectors: usize,
    /// Number of registered documents.
    pub total_documents: usize,
}

/// Estimate the page a chunk came from as `floor(chunk_index / chunk_count * total_pages)`.
///
/// This is a proportional guess; the extractor does not report page boundaries.
pub fn estimate_page(chunk_index: usize, chunk_count: usize, total_pages: usize) -> usize {
    if chunk_count == 0 {
        return 0;
    }
    (chunk_index * total_pages) / chunk_count
}
