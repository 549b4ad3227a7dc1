//! Vector store trait and cosine similarity.

use async_trait::async_trait;

use crate::document::{Document, DocumentMetadata, SearchResult, StoreStats, VectorRecord};
use crate::error::{RagError, Result};

/// A storage backend for document vectors with similarity search.
///
/// Every [`VectorRecord`] refers to a [`Document`] registered in the same
/// store. Implementations must make [`insert_document`](VectorStore::insert_document)
/// and [`delete_document`](VectorStore::delete_document) atomic with respect to
/// concurrent readers.
///
/// # Example
///
/// ```rust,ignore
/// use studybuddy_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new(768);
/// store.insert_document("doc-1", metadata, records).await?;
/// let results = store.find_similar(&query_embedding, 5, None).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Append records to the collection. Returns the number added.
    ///
    /// No deduplication is performed.
    async fn add_vectors(&self, records: Vec<VectorRecord>) -> Result<usize>;

    /// Register or replace a document entry, stamping its creation time.
    async fn add_document(&self, id: &str, metadata: DocumentMetadata) -> Result<Document>;

    /// Register a document together with its records as one atomic step.
    ///
    /// Re-inserting an existing ID replaces its entry and all of its records.
    async fn insert_document(
        &self,
        id: &str,
        metadata: DocumentMetadata,
        records: Vec<VectorRecord>,
    ) -> Result<Document>;

    /// Return the `top_k` records most similar to `query`, ordered by
    /// descending similarity, optionally restricted to one document.
    async fn find_similar(
        &self,
        query: &[f32],
        top_k: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<SearchResult>>;

    /// All records belonging to a document, in insertion order.
    async fn get_document_vectors(&self, document_id: &str) -> Result<Vec<VectorRecord>>;

    /// Look up a document by ID.
    async fn get_document(&self, document_id: &str) -> Result<Option<Document>>;

    /// All registered documents, oldest first.
    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// Remove a document and every record that belongs to it.
    ///
    /// Returns the removed document.
    async fn delete_document(&self, document_id: &str) -> Result<Document>;

    /// Counts of vectors and documents held.
    async fn stats(&self) -> Result<StoreStats>;
}

/// Compute `dot(a, b) / (|a| * |b|)`.
///
/// A zero-magnitude input yields `NaN`; callers treat that as "no match".
///
/// # Errors
///
/// Returns [`RagError::DimensionMismatch`] if the slices differ in length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(RagError::DimensionMismatch { expected: a.len(), actual: b.len() });
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    Ok(dot / (norm_a * norm_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = [0.3, -0.4, 0.5];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_have_similarity_minus_one() {
        let sim = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_lengths_fail() {
        let err = cosine_similarity(&[1.0, 0.0], &[1.0]).unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn zero_vector_is_not_finite() {
        let sim = cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap();
        assert!(!sim.is_finite());
    }
}
