//! Document ingestion: extract → chunk → embed → store.
//!
//! The [`Ingestor`] coordinates a [`TextExtractor`], a [`Chunker`], an
//! [`EmbeddingProvider`] and a [`VectorStore`].
//!
//! # Example
//!
//! ```rust,ignore
//! use studybuddy_rag::{Ingestor, IngestRequest, InMemoryVectorStore, PdfExtractor, RagConfig};
//!
//! let ingestor = Ingestor::builder()
//!     .config(RagConfig::default())
//!     .extractor(Arc::new(PdfExtractor::new()))
//!     .embedding_provider(embedder)
//!     .vector_store(store)
//!     .build()?;
//!
//! let outcome = ingestor.ingest(IngestRequest::new("notes.pdf", bytes, path)).await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::chunking::{Chunker, SentenceChunker};
use crate::config::RagConfig;
use crate::document::{ChunkMetadata, DocumentMetadata, VectorRecord, estimate_page};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::extract::TextExtractor;
use crate::vectorstore::VectorStore;

/// A document waiting to be ingested.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// ID the document will be registered under.
    pub document_id: String,
    /// Original filename of the upload.
    pub filename: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
    /// Where the raw file is kept.
    pub source_path: PathBuf,
    /// When the upload was received.
    pub uploaded_at: DateTime<Utc>,
}

impl IngestRequest {
    /// Create a request with a freshly generated document ID.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            document_id: Uuid::new_v4().to_string(),
            filename: filename.into(),
            bytes,
            source_path: source_path.into(),
            uploaded_at: Utc::now(),
        }
    }

    /// Use a caller-chosen document ID.
    pub fn with_document_id(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = document_id.into();
        self
    }
}

/// Summary of a successful ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    /// ID of the registered document.
    pub doc_id: String,
    /// Number of chunks stored.
    pub chunk_count: usize,
    /// Number of pages reported by the extractor.
    pub page_count: usize,
}

/// Runs uploaded documents through the ingestion pipeline.
///
/// Construct one via [`Ingestor::builder()`].
pub struct Ingestor {
    config: RagConfig,
    extractor: Arc<dyn TextExtractor>,
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
}

impl Ingestor {
    /// Create a new [`IngestorBuilder`].
    pub fn builder() -> IngestorBuilder {
        IngestorBuilder::default()
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Ingest a single document.
    ///
    /// Nothing is registered unless every step succeeds; the document and its
    /// vectors become visible together.
    ///
    /// # Errors
    ///
    /// - [`RagError::ExtractionError`] / [`RagError::NoExtractableText`] if the
    ///   file cannot be read or holds no text
    /// - [`RagError::PipelineError`] if embedding or storage fails
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome> {
        let IngestRequest { document_id, filename, bytes, source_path, uploaded_at } = request;

        // 1. Extract text off the async executor
        let extractor = Arc::clone(&self.extractor);
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .map_err(|e| RagError::PipelineError(format!("extraction task failed: {e}")))??;

        // 2. Chunk
        let chunks = self.chunker.chunk(&extracted.text);
        if chunks.is_empty() {
            return Err(RagError::NoExtractableText);
        }

        // 3. Embed with bounded concurrency, preserving chunk order
        // The stream owns its inputs so the ingest future stays `Send`.
        let embeddings: Vec<Vec<f32>> = stream::iter(chunks.clone())
            .map(|text| {
                let provider = Arc::clone(&self.embedding_provider);
                async move { provider.embed(&text).await }
            })
            .buffered(self.config.embed_concurrency)
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| {
                error!(document.id = %document_id, error = %e, "embedding failed during ingestion");
                RagError::PipelineError(format!("embedding failed for document '{document_id}': {e}"))
            })?;

        // 4. Build records
        let chunk_count = chunks.len();
        let page_count = extracted.page_count;
        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(chunk_index, (text, embedding))| VectorRecord {
                id: VectorRecord::record_id(&document_id, chunk_index),
                document_id: document_id.clone(),
                embedding,
                text,
                chunk_index,
                metadata: ChunkMetadata {
                    filename: filename.clone(),
                    page: estimate_page(chunk_index, chunk_count, page_count),
                    total_pages: page_count,
                },
            })
            .collect();

        // 5. Register document and vectors together
        let metadata = DocumentMetadata {
            filename,
            uploaded_at,
            num_chunks: chunk_count,
            num_pages: page_count,
            source_path,
        };
        self.vector_store.insert_document(&document_id, metadata, records).await.map_err(|e| {
            error!(document.id = %document_id, error = %e, "store insert failed during ingestion");
            RagError::PipelineError(format!("insert failed for document '{document_id}': {e}"))
        })?;

        info!(document.id = %document_id, chunk_count, page_count, "ingested document");

        Ok(IngestOutcome { doc_id: document_id, chunk_count, page_count })
    }
}

/// Builder for constructing an [`Ingestor`].
///
/// The chunker defaults to a [`SentenceChunker`] using the configured size and
/// overlap. All other fields are required.
#[derive(Default)]
pub struct IngestorBuilder {
    config: Option<RagConfig>,
    extractor: Option<Arc<dyn TextExtractor>>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
}

impl IngestorBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the text extractor.
    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Override the chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Build the [`Ingestor`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing, or
    /// [`RagError::ChunkingError`] if the default chunker cannot be built from
    /// the configuration.
    pub fn build(self) -> Result<Ingestor> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let extractor = self
            .extractor
            .ok_or_else(|| RagError::ConfigError("extractor is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(SentenceChunker::new(config.chunk_size, config.chunk_overlap)?),
        };

        Ok(Ingestor { config, extractor, chunker, embedding_provider, vector_store })
    }
}
