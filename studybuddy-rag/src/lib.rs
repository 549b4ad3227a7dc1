//! # studybuddy-rag
//!
//! Retrieval core for StudyBuddy: turns uploaded study material into
//! searchable passages.
//!
//! ## Overview
//!
//! - [`SentenceChunker`] splits extracted text into overlapping windows that
//!   prefer sentence boundaries
//! - [`EmbeddingProvider`] maps text to vectors; [`ResilientEmbedder`] wraps a
//!   real backend and degrades to the deterministic [`HashEmbeddingProvider`]
//! - [`InMemoryVectorStore`] holds vectors and document entries and answers
//!   cosine-similarity queries
//! - [`Retriever`] embeds a query and searches the store
//! - [`Ingestor`] runs extract → chunk → embed → store for an upload
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use studybuddy_rag::*;
//!
//! let config = RagConfig::default();
//! let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new(config.dimensions));
//! let embedder: Arc<dyn EmbeddingProvider> =
//!     Arc::new(ResilientEmbedder::new(config.dimensions, config.model_timeout));
//!
//! let ingestor = Ingestor::builder()
//!     .config(config.clone())
//!     .extractor(Arc::new(PdfExtractor::new()))
//!     .embedding_provider(embedder.clone())
//!     .vector_store(store.clone())
//!     .build()?;
//! ingestor.ingest(IngestRequest::new("notes.pdf", bytes, "uploads/notes.pdf")).await?;
//!
//! let retriever = Retriever::new(embedder, store, config.top_k);
//! let passages = retriever.search("what is an array?", None, None).await?;
//! ```
//!
//! ## Features
//!
//! - `gemini`: [`gemini::GeminiEmbeddingProvider`], backed by the Gemini REST API

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod ingest;
pub mod inmemory;
pub mod retriever;
pub mod vectorstore;

pub use chunking::{Chunker, SentenceChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{
    ChunkMetadata, Document, DocumentMetadata, SearchResult, StoreStats, VectorRecord,
    estimate_page,
};
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider, ResilientEmbedder};
pub use error::{RagError, Result};
pub use extract::{ExtractedText, PdfExtractor, PlainTextExtractor, TextExtractor};
#[cfg(feature = "gemini")]
pub use gemini::GeminiEmbeddingProvider;
pub use ingest::{IngestOutcome, IngestRequest, Ingestor, IngestorBuilder};
pub use inmemory::InMemoryVectorStore;
pub use retriever::Retriever;
pub use vectorstore::{VectorStore, cosine_similarity};
