//! A partition paired with the embedder that fills and queries it.

use super::{Chunk, DocumentFilter, IndexedChunk, IndexedDocument, ScoredChunk, SourceType, VectorStore};
use crate::embedding::Embedder;
use crate::error::{Result, VidsageError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Embedding-backed index over one partition.
///
/// The embedder is fixed for the lifetime of the index. Store failures are
/// reported as [`VidsageError::Indexing`] or [`VidsageError::Query`]; embedding
/// failures keep their own kind.
pub struct EmbeddingIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    stale: AtomicBool,
}

impl EmbeddingIndex {
    /// Open an index over `store`, checking the stored embedder fingerprint.
    ///
    /// A partition built by a different embedder is opened but marked stale;
    /// reads and writes are refused until it is cleared.
    #[instrument(skip_all, fields(partition = store.source_type().partition()))]
    pub async fn open(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let current = embedder.fingerprint();
        let stored = store.embedder_fingerprint().await.map_err(|e| e.into_indexing())?;

        let stale = match stored {
            None => {
                store
                    .set_embedder_fingerprint(&current)
                    .await
                    .map_err(|e| e.into_indexing())?;
                false
            }
            Some(ref fingerprint) if *fingerprint == current => false,
            Some(fingerprint) => {
                warn!(
                    "Partition '{}' was built with embedder '{}' but '{}' is configured; run `vidsage reindex`",
                    store.source_type().partition(),
                    fingerprint,
                    current
                );
                true
            }
        };

        Ok(Self {
            store,
            embedder,
            stale: AtomicBool::new(stale),
        })
    }

    pub fn source_type(&self) -> SourceType {
        self.store.source_type()
    }

    /// Whether the stored vectors came from a different embedder.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    fn ensure_fresh(&self) -> Result<()> {
        if self.is_stale() {
            return Err(VidsageError::Configuration(format!(
                "the '{}' partition was built with a different embedder than '{}'; run `vidsage reindex` to rebuild it",
                self.source_type().partition(),
                self.embedder.fingerprint()
            )));
        }
        Ok(())
    }

    fn check_partition(&self, chunks: &[Chunk]) -> Result<()> {
        match chunks.iter().find(|c| c.source_type != self.source_type()) {
            Some(foreign) => Err(VidsageError::Indexing(format!(
                "chunk {} belongs to the {} partition, not {}",
                foreign.id,
                foreign.source_type.partition(),
                self.source_type().partition()
            ))),
            None => Ok(()),
        }
    }

    async fn embed_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<IndexedChunk>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(VidsageError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        Ok(chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk::new(chunk, embedding))
            .collect())
    }

    /// Embed and persist chunks, overwriting any with the same id.
    #[instrument(skip(self, chunks), fields(partition = self.source_type().partition(), count = chunks.len()))]
    pub async fn upsert(&self, chunks: Vec<Chunk>) -> Result<usize> {
        self.ensure_fresh()?;
        self.check_partition(&chunks)?;
        let indexed = self.embed_chunks(chunks).await.map_err(|e| e.into_indexing())?;
        self.store
            .upsert_batch(&indexed)
            .await
            .map_err(|e| e.into_indexing())
    }

    /// Replace every chunk of `document_id` with `chunks`.
    ///
    /// All embeddings are computed before the partition is touched, so a
    /// failing embedder leaves the previous chunks in place. Returns the
    /// number of chunks removed.
    #[instrument(skip(self, chunks), fields(partition = self.source_type().partition(), count = chunks.len()))]
    pub async fn replace_document(&self, document_id: &str, chunks: Vec<Chunk>) -> Result<usize> {
        self.ensure_fresh()?;

        if let Some(foreign) = chunks.iter().find(|c| c.document_id != document_id) {
            return Err(VidsageError::Indexing(format!(
                "chunk {} does not belong to document {}",
                foreign.id, document_id
            )));
        }
        self.check_partition(&chunks)?;

        let indexed = self.embed_chunks(chunks).await.map_err(|e| e.into_indexing())?;
        let removed = self
            .store
            .replace_document(document_id, &indexed)
            .await
            .map_err(|e| e.into_indexing())?;

        debug!(
            "Replaced document {}: {} removed, {} inserted",
            document_id,
            removed,
            indexed.len()
        );
        Ok(removed)
    }

    /// Remove all chunks for a document. Returns 0 if there were none.
    pub async fn delete_by_document(&self, document_id: &str) -> Result<usize> {
        self.store
            .delete_by_document(document_id)
            .await
            .map_err(|e| e.into_indexing())
    }

    /// Up to `k` nearest chunks to `query_text`, by ascending cosine distance.
    #[instrument(skip(self, query_text, document_ids), fields(partition = self.source_type().partition()))]
    pub async fn query(
        &self,
        query_text: &str,
        k: usize,
        document_ids: Option<&DocumentFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        self.ensure_fresh()?;

        if k == 0 || document_ids.is_some_and(|f| f.is_empty()) {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(query_text)
            .await
            .map_err(|e| e.into_query())?;

        let results = self
            .store
            .search(&query_embedding, k, document_ids)
            .await
            .map_err(|e| e.into_query())?;

        debug!("Query returned {} chunks", results.len());
        Ok(results)
    }

    /// Remove every chunk and adopt the current embedder.
    #[instrument(skip(self), fields(partition = self.source_type().partition()))]
    pub async fn clear(&self) -> Result<usize> {
        let removed = self.store.clear().await.map_err(|e| e.into_indexing())?;
        self.store
            .set_embedder_fingerprint(&self.embedder.fingerprint())
            .await
            .map_err(|e| e.into_indexing())?;
        self.stale.store(false, Ordering::SeqCst);

        info!(
            "Cleared partition '{}' ({} chunks)",
            self.source_type().partition(),
            removed
        );
        Ok(removed)
    }

    pub async fn contains_document(&self, document_id: &str) -> Result<bool> {
        let chunks = self.chunks_for_document(document_id).await?;
        Ok(!chunks.is_empty())
    }

    pub async fn list_documents(&self) -> Result<Vec<IndexedDocument>> {
        self.store.list_documents().await.map_err(|e| e.into_query())
    }

    /// Stored chunks of a document, in chunk order.
    pub async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        self.store
            .get_by_document(document_id)
            .await
            .map_err(|e| e.into_query())
    }

    pub async fn chunk_count(&self) -> Result<usize> {
        self.store.chunk_count().await.map_err(|e| e.into_query())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::vector_store::{MemoryVectorStore, SqliteVectorStore};
    use async_trait::async_trait;

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(VidsageError::Embedding("backend unreachable".to_string()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(VidsageError::Embedding("backend unreachable".to_string()))
        }

        fn dimensions(&self) -> usize {
            8
        }

        fn fingerprint(&self) -> String {
            "hashing:8".to_string()
        }
    }

    fn chunks(doc: &str, texts: &[&str], source: SourceType) -> Vec<Chunk> {
        let total = texts.len() as u32;
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk::new(doc, "Title", t.to_string(), i as u32, total, source))
            .collect()
    }

    async fn hashing_index(store: Arc<dyn VectorStore>) -> EmbeddingIndex {
        EmbeddingIndex::open(store, Arc::new(HashingEmbedder::new(8).unwrap()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_query_ranks_closest_first() {
        let index = hashing_index(Arc::new(MemoryVectorStore::new(SourceType::Transcript))).await;
        index
            .upsert(chunks(
                "v1",
                &["rust ownership and borrowing", "baking bread with sourdough"],
                SourceType::Transcript,
            ))
            .await
            .unwrap();

        let results = index.query("rust ownership and borrowing", 5, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_index, 0);
        assert!(results[0].distance.abs() < 1e-4);
        assert!(results[0].distance <= results[1].distance);
    }

    #[tokio::test]
    async fn test_failing_embedder_keeps_prior_chunks() {
        let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new(SourceType::Report));
        let good = hashing_index(store.clone()).await;
        good.replace_document("v", chunks("v", &["one", "two"], SourceType::Report))
            .await
            .unwrap();

        let failing = EmbeddingIndex::open(store.clone(), Arc::new(FailingEmbedder))
            .await
            .unwrap();
        let err = failing
            .replace_document("v", chunks("v", &["three"], SourceType::Report))
            .await
            .unwrap_err();

        assert!(err.is_embedding_unavailable());
        assert_eq!(store.get_by_document("v").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_query_embedding_failure_is_not_empty_result() {
        let index = EmbeddingIndex::open(
            Arc::new(MemoryVectorStore::new(SourceType::Report)),
            Arc::new(FailingEmbedder),
        )
        .await
        .unwrap();

        let err = index.query("anything", 5, None).await.unwrap_err();
        assert!(matches!(err, VidsageError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_fingerprint_mismatch_marks_partition_stale() {
        let store: Arc<dyn VectorStore> =
            Arc::new(SqliteVectorStore::in_memory(SourceType::Report).unwrap());
        let first = hashing_index(store.clone()).await;
        first
            .upsert(chunks("v", &["alpha"], SourceType::Report))
            .await
            .unwrap();

        let other = EmbeddingIndex::open(store.clone(), Arc::new(HashingEmbedder::new(16).unwrap()))
            .await
            .unwrap();
        assert!(other.is_stale());
        assert!(matches!(
            other.query("alpha", 5, None).await,
            Err(VidsageError::Configuration(msg)) if msg.contains("reindex")
        ));
        assert!(matches!(
            other.upsert(chunks("w", &["beta"], SourceType::Report)).await,
            Err(VidsageError::Configuration(_))
        ));

        assert_eq!(other.clear().await.unwrap(), 1);
        assert!(!other.is_stale());
        assert_eq!(
            store.embedder_fingerprint().await.unwrap().as_deref(),
            Some("hashing:16")
        );
        other
            .upsert(chunks("w", &["beta"], SourceType::Report))
            .await
            .unwrap();
        assert_eq!(other.query("beta", 5, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_document_is_noop() {
        let index = hashing_index(Arc::new(MemoryVectorStore::new(SourceType::Report))).await;
        assert_eq!(index.delete_by_document("missing").await.unwrap(), 0);
        assert!(!index.contains_document("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_rejects_foreign_chunks() {
        let index = hashing_index(Arc::new(MemoryVectorStore::new(SourceType::Report))).await;
        let err = index
            .replace_document("v", chunks("w", &["x"], SourceType::Report))
            .await
            .unwrap_err();
        assert!(matches!(err, VidsageError::Indexing(_)));
    }

    #[tokio::test]
    async fn test_rejects_chunks_for_other_partition() {
        let stores: [Arc<dyn VectorStore>; 2] = [
            Arc::new(MemoryVectorStore::new(SourceType::Report)),
            Arc::new(SqliteVectorStore::in_memory(SourceType::Report).unwrap()),
        ];
        for store in stores {
            let index = hashing_index(store.clone()).await;

            let err = index
                .upsert(chunks("v", &["spoken"], SourceType::Transcript))
                .await
                .unwrap_err();
            assert!(matches!(err, VidsageError::Indexing(_)));

            let err = index
                .replace_document("v", chunks("v", &["spoken"], SourceType::Transcript))
                .await
                .unwrap_err();
            assert!(matches!(err, VidsageError::Indexing(_)));
            assert_eq!(store.chunk_count().await.unwrap(), 0);
        }
    }
}
