//! Embedding providers.
//!
//! [`EmbeddingProvider`] is the seam between the retrieval core and whatever
//! produces vectors. Two implementations live here:
//!
//! - [`HashEmbeddingProvider`]: deterministic and offline, not semantically meaningful
//! - [`ResilientEmbedder`]: wraps an optional real backend and degrades to the
//!   hash provider on any failure, timeout, or malformed vector

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. The default [`embed_batch`](EmbeddingProvider::embed_batch)
/// implementation calls [`embed`](EmbeddingProvider::embed) sequentially.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Short provider name used in logs.
    fn name(&self) -> &str;
}

/// Deterministic embeddings derived from a rolling hash of the input.
///
/// The hash is `h = h * 31 + unit` over the UTF-16 code units of the text,
/// wrapped to a 32-bit signed integer. Component `i` is `sin(h * (i + 1)) * 0.1`
/// and the vector is then L2-normalized. Identical text always yields an
/// identical vector. Non-empty text whose hash wraps to zero (such as `"\0"`)
/// is hashed as [`ZERO_HASH_SEED`] instead, so it still gets a unit vector.
/// Only the empty string yields the zero vector, which the store treats as
/// matching nothing.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    /// Create a provider producing vectors of `dimensions` components.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Compute the embedding synchronously.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let hash = match text_hash(text) {
            0 if !text.is_empty() => ZERO_HASH_SEED,
            hash => hash,
        };
        let hash = f64::from(hash);
        let mut embedding: Vec<f32> = (0..self.dimensions)
            .map(|i| ((hash * (i as f64 + 1.0)).sin() * 0.1) as f32)
            .collect();

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        embedding
    }
}

/// Stand-in hash for non-empty text whose rolling hash is zero.
pub const ZERO_HASH_SEED: i32 = 0x5f37_59df;

fn text_hash(text: &str) -> i32 {
    text.encode_utf16().fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// An embedder that never fails.
///
/// Calls the primary provider (if any) under a timeout and checks the length of
/// what comes back. Errors, timeouts and wrong-length vectors are logged and
/// replaced by a [`HashEmbeddingProvider`] vector of the same dimensionality.
///
/// # Example
///
/// ```rust,ignore
/// let embedder = ResilientEmbedder::new(768, Duration::from_secs(30))
///     .with_primary(Arc::new(GeminiEmbeddingProvider::new(api_key)?));
/// let vector = embedder.embed("what is a sine wave?").await?;
/// ```
#[derive(Clone)]
pub struct ResilientEmbedder {
    primary: Option<Arc<dyn EmbeddingProvider>>,
    fallback: HashEmbeddingProvider,
    timeout: Duration,
}

impl ResilientEmbedder {
    /// Create an embedder with no primary backend; every call uses the fallback.
    pub fn new(dimensions: usize, timeout: Duration) -> Self {
        Self { primary: None, fallback: HashEmbeddingProvider::new(dimensions), timeout }
    }

    /// Set the real backend tried before the fallback.
    pub fn with_primary(mut self, primary: Arc<dyn EmbeddingProvider>) -> Self {
        self.primary = Some(primary);
        self
    }

    /// Whether a real backend is configured.
    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    async fn try_primary(&self, primary: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
        let embedding = tokio::time::timeout(self.timeout, primary.embed(text))
            .await
            .map_err(|_| RagError::EmbeddingError {
                provider: primary.name().to_string(),
                message: format!("timed out after {:?}", self.timeout),
            })??;

        let expected = self.fallback.dimensions();
        if embedding.len() != expected {
            return Err(RagError::DimensionMismatch { expected, actual: embedding.len() });
        }
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for ResilientEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(primary) = &self.primary {
            match self.try_primary(primary.as_ref(), text).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) => {
                    warn!(provider = primary.name(), error = %e, "embedding failed, using fallback");
                }
            }
        } else {
            debug!(text_len = text.len(), "no embedding backend configured, using fallback");
        }
        Ok(self.fallback.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.fallback.dimensions()
    }

    fn name(&self) -> &str {
        self.primary.as_ref().map_or("hash", |p| p.name())
    }
}
