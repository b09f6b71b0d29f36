//! Embedding generation for semantic search and retrieval.
//!
//! The embedder is chosen once, when the index is opened, and every vector in
//! a partition must come from the same embedder. [`Embedder::fingerprint`]
//! identifies it so a partition can detect vectors built by another one.

mod cache;
mod hashing;
mod openai;

pub use cache::CachedEmbedder;
pub use hashing::HashingEmbedder;
pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingProvider, EmbeddingSettings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Stable identifier of the embedding function (provider, model, dimensions).
    fn fingerprint(&self) -> String;
}

/// Build the embedder described by the settings.
///
/// Fails with a configuration error when the backend cannot be used, e.g. the
/// OpenAI provider without an API key.
pub fn create_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match settings.provider {
        EmbeddingProvider::OpenAI => Arc::new(OpenAIEmbedder::from_settings(settings)?),
        EmbeddingProvider::Hashing => {
            Arc::new(HashingEmbedder::new(settings.dimensions as usize)?)
        }
    };

    if settings.cache {
        Ok(Arc::new(CachedEmbedder::new(embedder)))
    } else {
        Ok(embedder)
    }
}
