//! Vector store abstraction for Vidsage.
//!
//! Chunks live in two independent partitions, one for report chunks and one
//! for transcript chunks. Each [`VectorStore`] instance holds exactly one
//! partition behind its own lock; [`EmbeddingIndex`] pairs a partition with
//! the embedder used to fill and query it.

mod index;
mod memory;
mod sqlite;

pub use index::EmbeddingIndex;
pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of document ids a query is restricted to.
pub type DocumentFilter = BTreeSet<String>;

/// Where a chunk came from; also names the partition holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Report,
    Transcript,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Report => "report",
            SourceType::Transcript => "transcript",
        }
    }

    /// Partition name.
    pub fn partition(&self) -> &'static str {
        match self {
            SourceType::Report => "reports",
            SourceType::Transcript => "transcripts",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of indexed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic id, see [`Chunk::make_id`].
    pub id: String,
    /// Text content of this chunk.
    pub text: String,
    /// Video/report this chunk belongs to.
    pub document_id: String,
    /// Document title at indexing time.
    pub document_title: String,
    /// Position of this chunk in the document.
    pub chunk_index: u32,
    /// Number of chunks the document was split into.
    pub total_chunks: u32,
    pub source_type: SourceType,
}

impl Chunk {
    pub fn new(
        document_id: &str,
        document_title: &str,
        text: String,
        chunk_index: u32,
        total_chunks: u32,
        source_type: SourceType,
    ) -> Self {
        Self {
            id: Self::make_id(document_id, chunk_index, total_chunks),
            text,
            document_id: document_id.to_string(),
            document_title: document_title.to_string(),
            chunk_index,
            total_chunks,
            source_type,
        }
    }

    /// Build the id for a chunk position. Same document and chunk count give
    /// the same ids, so re-indexing overwrites rather than duplicates.
    pub fn make_id(document_id: &str, chunk_index: u32, total_chunks: u32) -> String {
        format!("{}_chunk_{}_of_{}", document_id, chunk_index, total_chunks)
    }
}

/// A chunk together with its embedding, as persisted by a partition.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    /// Embedding of `chunk.text`.
    pub embedding: Vec<f32>,
    pub indexed_at: DateTime<Utc>,
}

impl IndexedChunk {
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            chunk,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A search hit with its distance to the query (lower is more similar).
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub distance: f32,
}

/// Summary information about an indexed document in one partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub document_id: String,
    pub document_title: String,
    pub source_type: SourceType,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// When the document was last indexed.
    pub indexed_at: DateTime<Utc>,
}

/// One partition of the vector database.
///
/// Implementations serialize all operations on the partition behind a single
/// lock; nothing is held across an await point.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Partition held by this store.
    fn source_type(&self) -> SourceType;

    /// Insert chunks, overwriting any with the same id.
    async fn upsert_batch(&self, chunks: &[IndexedChunk]) -> Result<usize>;

    /// Delete every chunk of `document_id` and insert `chunks` as one atomic step.
    async fn replace_document(&self, document_id: &str, chunks: &[IndexedChunk]) -> Result<usize>;

    /// Delete chunks by document id. Returns the number removed.
    async fn delete_by_document(&self, document_id: &str) -> Result<usize>;

    /// Nearest chunks to `query_embedding` by ascending cosine distance,
    /// optionally restricted to a set of documents.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        document_ids: Option<&DocumentFilter>,
    ) -> Result<Vec<ScoredChunk>>;

    /// All chunks for a document, in chunk order.
    async fn get_by_document(&self, document_id: &str) -> Result<Vec<Chunk>>;

    /// List all indexed documents.
    async fn list_documents(&self) -> Result<Vec<IndexedDocument>>;

    /// Remove every chunk. Returns the number removed.
    async fn clear(&self) -> Result<usize>;

    /// Get total chunk count.
    async fn chunk_count(&self) -> Result<usize>;

    /// Fingerprint of the embedder the stored vectors were built with.
    async fn embedder_fingerprint(&self) -> Result<Option<String>>;

    /// Record the embedder fingerprint.
    async fn set_embedder_fingerprint(&self, fingerprint: &str) -> Result<()>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Cosine distance, `1 - cosine_similarity`, in `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Order hits by ascending distance, then by document and position.
pub(crate) fn rank(results: &mut Vec<ScoredChunk>, limit: usize) {
    results.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.chunk.document_id.cmp(&b.chunk.document_id))
            .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
    });
    results.truncate(limit);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_distance_range() {
        let a = vec![1.0, 0.0];
        assert!(cosine_distance(&a, &a).abs() < 0.001);
        assert!((cosine_distance(&a, &[0.0, 1.0]) - 1.0).abs() < 0.001);
        assert!((cosine_distance(&a, &[-1.0, 0.0]) - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_chunk_ids_are_deterministic() {
        let chunk = Chunk::new("v1", "Intro", "text".to_string(), 2, 5, SourceType::Report);
        assert_eq!(chunk.id, "v1_chunk_2_of_5");
        assert_eq!(Chunk::make_id("v1", 2, 5), chunk.id);
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let hit = |doc: &str, index: u32, distance: f32| ScoredChunk {
            chunk: Chunk::new(doc, "t", String::new(), index, 3, SourceType::Transcript),
            distance,
        };
        let mut results = vec![hit("b", 0, 0.5), hit("a", 1, 0.2), hit("a", 0, 0.5), hit("c", 0, 0.9)];
        rank(&mut results, 3);

        let order: Vec<(&str, u32)> = results
            .iter()
            .map(|r| (r.chunk.document_id.as_str(), r.chunk.chunk_index))
            .collect();
        assert_eq!(order, vec![("a", 1), ("a", 0), ("b", 0)]);
    }

    #[test]
    fn test_partition_names() {
        assert_eq!(SourceType::Report.partition(), "reports");
        assert_eq!(SourceType::Transcript.partition(), "transcripts");
        assert_eq!(SourceType::Transcript.to_string(), "transcript");
    }
}
