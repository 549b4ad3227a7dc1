//! Query-time retrieval: embed the query, then search the store.

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Turns a free-text query into ranked supporting passages.
///
/// Every call embeds the query afresh; nothing is cached.
#[derive(Clone)]
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    default_top_k: usize,
}

impl Retriever {
    /// Create a retriever returning `default_top_k` results unless told otherwise.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        default_top_k: usize,
    ) -> Self {
        Self { embedding_provider, vector_store, default_top_k }
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Search for passages relevant to `query`.
    ///
    /// # Errors
    ///
    /// - [`RagError::ValidationError`] if the query is blank
    /// - [`RagError::NotFound`] if `document_id` names an unknown document
    /// - [`RagError::PipelineError`] if the query cannot be embedded
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
        document_id: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(RagError::ValidationError("query must not be empty".to_string()));
        }
        let top_k = top_k.unwrap_or(self.default_top_k);

        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            RagError::PipelineError(format!("query embedding failed: {e}"))
        })?;

        let results = self.vector_store.find_similar(&query_embedding, top_k, document_id).await?;
        debug!(result_count = results.len(), top_k, document.id = ?document_id, "search completed");
        Ok(results)
    }
}
