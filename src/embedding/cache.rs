//! In-process embedding cache keyed by content hash.
//!
//! Re-indexing a document whose text has not changed reuses the vectors
//! computed for it earlier instead of calling the backend again. Entries live
//! only as long as the process and are bounded; the oldest are evicted first.

use super::Embedder;
use crate::error::{Result, VidsageError};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Default number of cached vectors.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

#[derive(Default)]
struct Entries {
    vectors: HashMap<String, Vec<f32>>,
    order: VecDeque<String>,
}

impl Entries {
    fn get(&self, key: &str) -> Option<Vec<f32>> {
        self.vectors.get(key).cloned()
    }

    fn insert(&mut self, key: String, vector: Vec<f32>, capacity: usize) {
        if self.vectors.insert(key.clone(), vector).is_none() {
            self.order.push_back(key);
        }
        while self.vectors.len() > capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.vectors.remove(&oldest);
                }
                None => break,
            }
        }
    }

    fn clear(&mut self) {
        self.vectors.clear();
        self.order.clear();
    }
}

/// Embedder wrapper that memoizes vectors by SHA-256 of the input text.
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    capacity: usize,
    entries: Mutex<Entries>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    /// Cache at most `capacity` vectors.
    pub fn with_capacity(inner: Arc<dyn Embedder>, capacity: usize) -> Self {
        Self {
            inner,
            capacity,
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Number of cached vectors.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.vectors.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached vector.
    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Entries>> {
        self.entries
            .lock()
            .map_err(|e| VidsageError::Embedding(format!("Failed to acquire cache lock: {}", e)))
    }

    fn cache_key(text: &str) -> String {
        format!("{:x}", Sha256::digest(text.as_bytes()))
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| VidsageError::Embedding("Empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let keys: Vec<String> = texts.iter().map(|t| Self::cache_key(t)).collect();

        let mut results: Vec<Option<Vec<f32>>> = {
            let entries = self.lock()?;
            keys.iter().map(|k| entries.get(k)).collect()
        };

        let missing: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_none())
            .map(|(i, _)| i)
            .collect();

        debug!(
            "Embedding cache: {} hits, {} misses",
            texts.len() - missing.len(),
            missing.len()
        );

        if !missing.is_empty() {
            let to_embed: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let fresh = self.inner.embed_batch(&to_embed).await?;

            if fresh.len() != to_embed.len() {
                return Err(VidsageError::Embedding(format!(
                    "Expected {} embeddings, backend returned {}",
                    to_embed.len(),
                    fresh.len()
                )));
            }

            let mut entries = self.lock()?;
            for (&i, vector) in missing.iter().zip(fresh) {
                entries.insert(keys[i].clone(), vector.clone(), self.capacity);
                results[i] = Some(vector);
            }
        }

        results
            .into_iter()
            .map(|r| r.ok_or_else(|| VidsageError::Embedding("Missing cached embedding".to_string())))
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn fingerprint(&self) -> String {
        self.inner.fingerprint()
    }
}
