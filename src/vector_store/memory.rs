//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{
    cosine_distance, rank, Chunk, DocumentFilter, IndexedChunk, IndexedDocument, ScoredChunk,
    SourceType, VectorStore,
};
use crate::error::{Result, VidsageError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Partition {
    chunks: HashMap<String, IndexedChunk>,
    fingerprint: Option<String>,
}

impl Partition {
    fn remove_document(&mut self, document_id: &str) -> usize {
        let initial_len = self.chunks.len();
        self.chunks.retain(|_, c| c.chunk.document_id != document_id);
        initial_len - self.chunks.len()
    }

    fn insert_all(&mut self, chunks: &[IndexedChunk]) {
        for chunk in chunks {
            self.chunks.insert(chunk.chunk.id.clone(), chunk.clone());
        }
    }
}

/// In-memory vector store holding one partition.
pub struct MemoryVectorStore {
    source_type: SourceType,
    partition: Mutex<Partition>,
}

impl MemoryVectorStore {
    /// Create a new, empty partition.
    pub fn new(source_type: SourceType) -> Self {
        Self {
            source_type,
            partition: Mutex::new(Partition::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Partition>> {
        self.partition
            .lock()
            .map_err(|e| VidsageError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn check_partition(&self, chunks: &[IndexedChunk]) -> Result<()> {
        match chunks.iter().find(|c| c.chunk.source_type != self.source_type) {
            Some(foreign) => Err(VidsageError::VectorStore(format!(
                "Chunk {} belongs to the {} partition, not {}",
                foreign.chunk.id,
                foreign.chunk.source_type.partition(),
                self.source_type.partition()
            ))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn source_type(&self) -> SourceType {
        self.source_type
    }

    async fn upsert_batch(&self, chunks: &[IndexedChunk]) -> Result<usize> {
        self.check_partition(chunks)?;
        self.lock()?.insert_all(chunks);
        Ok(chunks.len())
    }

    async fn replace_document(&self, document_id: &str, chunks: &[IndexedChunk]) -> Result<usize> {
        self.check_partition(chunks)?;
        let mut partition = self.lock()?;
        let removed = partition.remove_document(document_id);
        partition.insert_all(chunks);
        Ok(removed)
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<usize> {
        Ok(self.lock()?.remove_document(document_id))
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        document_ids: Option<&DocumentFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        if limit == 0 || document_ids.is_some_and(|f| f.is_empty()) {
            return Ok(Vec::new());
        }

        let partition = self.lock()?;

        let mut results: Vec<ScoredChunk> = partition
            .chunks
            .values()
            .filter(|c| document_ids.map_or(true, |f| f.contains(&c.chunk.document_id)))
            .map(|c| ScoredChunk {
                chunk: c.chunk.clone(),
                distance: cosine_distance(query_embedding, &c.embedding),
            })
            .collect();

        rank(&mut results, limit);
        Ok(results)
    }

    async fn get_by_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let partition = self.lock()?;
        let mut result: Vec<Chunk> = partition
            .chunks
            .values()
            .filter(|c| c.chunk.document_id == document_id)
            .map(|c| c.chunk.clone())
            .collect();
        result.sort_by_key(|c| c.chunk_index);
        Ok(result)
    }

    async fn list_documents(&self) -> Result<Vec<IndexedDocument>> {
        let partition = self.lock()?;

        let mut document_map: HashMap<String, IndexedDocument> = HashMap::new();

        for indexed in partition.chunks.values() {
            let chunk = &indexed.chunk;
            let entry = document_map
                .entry(chunk.document_id.clone())
                .or_insert_with(|| IndexedDocument {
                    document_id: chunk.document_id.clone(),
                    document_title: chunk.document_title.clone(),
                    source_type: self.source_type,
                    chunk_count: 0,
                    indexed_at: indexed.indexed_at,
                });

            entry.chunk_count += 1;
            if indexed.indexed_at > entry.indexed_at {
                entry.indexed_at = indexed.indexed_at;
            }
        }

        let mut documents: Vec<IndexedDocument> = document_map.into_values().collect();
        documents.sort_by(|a, b| {
            b.indexed_at
                .cmp(&a.indexed_at)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });

        Ok(documents)
    }

    async fn clear(&self) -> Result<usize> {
        let mut partition = self.lock()?;
        let removed = partition.chunks.len();
        partition.chunks.clear();
        partition.fingerprint = None;
        Ok(removed)
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(self.lock()?.chunks.len())
    }

    async fn embedder_fingerprint(&self) -> Result<Option<String>> {
        Ok(self.lock()?.fingerprint.clone())
    }

    async fn set_embedder_fingerprint(&self, fingerprint: &str) -> Result<()> {
        self.lock()?.fingerprint = Some(fingerprint.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed(doc: &str, index: u32, total: u32, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk::new(
            Chunk::new(doc, "Test Video", format!("{} part {}", doc, index), index, total, SourceType::Report),
            embedding,
        )
    }

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new(SourceType::Report);

        store
            .upsert_batch(&[
                indexed("video1", 0, 2, vec![1.0, 0.0, 0.0]),
                indexed("video1", 1, 2, vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.chunk_count().await.unwrap(), 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].distance < results[1].distance);
        assert_eq!(results[0].chunk.chunk_index, 0);

        let documents = store.list_documents().await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].chunk_count, 2);
    }

    #[tokio::test]
    async fn test_rejects_chunk_from_other_partition() {
        let store = MemoryVectorStore::new(SourceType::Report);
        store.upsert_batch(&[indexed("v", 0, 1, vec![1.0])]).await.unwrap();

        let transcript = IndexedChunk::new(
            Chunk::new("v", "Test Video", "spoken words".to_string(), 0, 1, SourceType::Transcript),
            vec![1.0],
        );
        let err = store.upsert_batch(&[transcript.clone()]).await.unwrap_err();
        assert!(matches!(err, VidsageError::VectorStore(_)));

        let err = store.replace_document("v", &[transcript]).await.unwrap_err();
        assert!(matches!(err, VidsageError::VectorStore(_)));
        assert_eq!(store.get_by_document("v").await.unwrap()[0].source_type, SourceType::Report);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_id() {
        let store = MemoryVectorStore::new(SourceType::Report);
        store.upsert_batch(&[indexed("v", 0, 1, vec![1.0, 0.0])]).await.unwrap();
        store.upsert_batch(&[indexed("v", 0, 1, vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(store.chunk_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_filter_restricts_results() {
        let store = MemoryVectorStore::new(SourceType::Transcript);
        store
            .upsert_batch(&[
                indexed("a", 0, 1, vec![1.0, 0.0]),
                indexed("b", 0, 1, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let filter: DocumentFilter = ["b".to_string()].into_iter().collect();
        let results = store.search(&[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.document_id, "b");

        let empty = DocumentFilter::new();
        assert!(store.search(&[1.0, 0.0], 10, Some(&empty)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_document_drops_stale_chunks() {
        let store = MemoryVectorStore::new(SourceType::Report);
        store
            .upsert_batch(&[
                indexed("v", 0, 3, vec![1.0]),
                indexed("v", 1, 3, vec![1.0]),
                indexed("v", 2, 3, vec![1.0]),
                indexed("w", 0, 1, vec![1.0]),
            ])
            .await
            .unwrap();

        let removed = store
            .replace_document("v", &[indexed("v", 0, 1, vec![1.0])])
            .await
            .unwrap();
        assert_eq!(removed, 3);

        let chunks = store.get_by_document("v").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "v_chunk_0_of_1");
        assert_eq!(store.chunk_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clear_resets_fingerprint() {
        let store = MemoryVectorStore::new(SourceType::Report);
        store.set_embedder_fingerprint("hashing:8").await.unwrap();
        store.upsert_batch(&[indexed("v", 0, 1, vec![1.0])]).await.unwrap();

        assert_eq!(store.clear().await.unwrap(), 1);
        assert_eq!(store.chunk_count().await.unwrap(), 0);
        assert!(store.embedder_fingerprint().await.unwrap().is_none());
    }
}
