//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `Vec` of records and a `HashMap` of documents, both behind a single
//! `tokio::sync::RwLock` so that registering or deleting a document and its
//! vectors is observed by readers as one step.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::document::{Document, DocumentMetadata, SearchResult, StoreStats, VectorRecord};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, cosine_similarity};

#[derive(Debug, Default)]
struct StoreState {
    records: Vec<VectorRecord>,
    documents: HashMap<String, Document>,
}

impl StoreState {
    fn register(&mut self, id: &str, metadata: DocumentMetadata) -> Document {
        let document = Document { id: id.to_string(), metadata, created_at: Utc::now() };
        self.documents.insert(id.to_string(), document.clone());
        document
    }
}

/// An in-memory vector store with a fixed embedding dimensionality.
///
/// Construct one per application (or per test) and share it behind an `Arc`.
///
/// # Example
///
/// ```rust,ignore
/// use studybuddy_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = Arc::new(InMemoryVectorStore::new(768));
/// let stats = store.stats().await?;
/// ```
#[derive(Debug)]
pub struct InMemoryVectorStore {
    dimensions: usize,
    state: RwLock<StoreState>,
}

impl InMemoryVectorStore {
    /// Create a new empty store holding vectors of `dimensions` components.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, state: RwLock::new(StoreState::default()) }
    }

    /// The embedding length every record must have.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn check_dimensions(&self, records: &[VectorRecord]) -> Result<()> {
        match records.iter().find(|r| r.embedding.len() != self.dimensions) {
            Some(bad) => {
                warn!(record.id = %bad.id, actual = bad.embedding.len(), "rejecting malformed embedding");
                Err(RagError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: bad.embedding.len(),
                })
            }
            None => Ok(()),
        }
    }
}

fn check_owner(id: &str, records: &[VectorRecord]) -> Result<()> {
    match records.iter().find(|r| r.document_id != id) {
        Some(stray) => Err(RagError::VectorStoreError {
            backend: "InMemory".to_string(),
            message: format!("record '{}' belongs to '{}', not '{id}'", stray.id, stray.document_id),
        }),
        None => Ok(()),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add_vectors(&self, records: Vec<VectorRecord>) -> Result<usize> {
        self.check_dimensions(&records)?;
        let mut state = self.state.write().await;
        if let Some(orphan) = records.iter().find(|r| !state.documents.contains_key(&r.document_id))
        {
            return Err(RagError::NotFound(orphan.document_id.clone()));
        }
        let added = records.len();
        state.records.extend(records);
        Ok(added)
    }

    async fn add_document(&self, id: &str, metadata: DocumentMetadata) -> Result<Document> {
        let mut state = self.state.write().await;
        Ok(state.register(id, metadata))
    }

    async fn insert_document(
        &self,
        id: &str,
        metadata: DocumentMetadata,
        records: Vec<VectorRecord>,
    ) -> Result<Document> {
        self.check_dimensions(&records)?;
        check_owner(id, &records)?;
        let mut state = self.state.write().await;
        let document = state.register(id, metadata);
        state.records.retain(|r| r.document_id != id);
        state.records.extend(records);
        Ok(document)
    }

    async fn find_similar(
        &self,
        query: &[f32],
        top_k: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let state = self.state.read().await;
        if let Some(id) = document_id {
            if !state.documents.contains_key(id) {
                return Err(RagError::NotFound(id.to_string()));
            }
        }

        let mut scored: Vec<(f32, &VectorRecord)> = state
            .records
            .iter()
            .filter(|record| document_id.is_none_or(|id| record.document_id == id))
            .filter_map(|record| match cosine_similarity(query, &record.embedding) {
                Ok(similarity) if similarity.is_finite() => Some((similarity, record)),
                Ok(_) => None,
                Err(e) => {
                    debug!(record.id = %record.id, error = %e, "skipping record");
                    None
                }
            })
            .collect();

        // `sort_by` is stable, so equal scores keep insertion order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(similarity, record)| SearchResult::from_record(record, similarity))
            .collect())
    }

    async fn get_document_vectors(&self, document_id: &str) -> Result<Vec<VectorRecord>> {
        let state = self.state.read().await;
        Ok(state.records.iter().filter(|r| r.document_id == document_id).cloned().collect())
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<Document>> {
        let state = self.state.read().await;
        Ok(state.documents.get(document_id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let state = self.state.read().await;
        let mut documents: Vec<Document> = state.documents.values().cloned().collect();
        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(documents)
    }

    async fn delete_document(&self, document_id: &str) -> Result<Document> {
        let mut state = self.state.write().await;
        let document = state
            .documents
            .remove(document_id)
            .ok_or_else(|| RagError::NotFound(document_id.to_string()))?;
        state.records.retain(|r| r.document_id != document_id);
        Ok(document)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let state = self.state.read().await;
        Ok(StoreStats { total_vectors: state.records.len(), total_documents: state.documents.len() })
    }
}
