//! Local feature-hashing embedder.
//!
//! Hashes lowercase word tokens and character trigrams into a fixed number of
//! buckets and L2-normalizes the result. Deterministic and offline, so it
//! suits tests and machines without API access; semantic quality is lexical.

use super::Embedder;
use crate::error::{Result, VidsageError};
use async_trait::async_trait;

/// Default number of hash buckets.
pub const DEFAULT_HASHING_DIMENSIONS: usize = 256;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Feature-hashing embedder.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(VidsageError::Configuration(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(Self { dimensions })
    }

    /// Embed synchronously.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions];
        let lowered = text.to_lowercase();

        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[self.bucket(word.as_bytes())] += 2.0;
        }

        let chars: Vec<char> = lowered.chars().filter(|c| !c.is_whitespace()).collect();
        for window in chars.windows(3) {
            let token: String = window.iter().collect();
            vector[self.bucket(token.as_bytes())] += 1.0;
        }

        let magnitude = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }

    fn bucket(&self, bytes: &[u8]) -> usize {
        let mut hash = FNV_OFFSET;
        for byte in bytes {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        (hash % self.dimensions as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_HASHING_DIMENSIONS,
        }
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn fingerprint(&self) -> String {
        format!("hashing:{}", self.dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::cosine_similarity;

    #[test]
    fn test_deterministic() {
        let embedder = HashingEmbedder::default();
        assert_eq!(
            embedder.embed_text("Vector search over transcripts"),
            embedder.embed_text("Vector search over transcripts")
        );
    }

    #[test]
    fn test_output_is_normalized() {
        let embedder = HashingEmbedder::new(32).unwrap();
        let vector = embedder.embed_text("abc def");
        assert_eq!(vector.len(), 32);
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(16).unwrap();
        assert!(embedder.embed_text("").iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_shared_words_are_closer() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed_text("rust borrow checker");
        let related = embedder.embed_text("The borrow checker in Rust enforces ownership");
        let unrelated = embedder.embed_text("Baking sourdough bread at home");

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let embedder = HashingEmbedder::default();
        let texts = vec!["first".to_string(), "second".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch[0], embedder.embed_text("first"));
        assert_eq!(batch[1], embedder.embed_text("second"));
    }
}
