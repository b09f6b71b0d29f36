//! Similarity search across the report and transcript partitions.

use crate::error::Result;
use crate::vector_store::{Chunk, DocumentFilter, EmbeddingIndex, ScoredChunk, SourceType};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Default number of results per partition.
pub const DEFAULT_K: usize = 10;

/// A retrieval query.
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub query: String,
    /// Results requested from each partition.
    pub k: usize,
    pub include_reports: bool,
    pub include_transcripts: bool,
    /// Restrict results to these documents. An empty set matches nothing.
    pub document_ids: Option<DocumentFilter>,
}

impl RetrievalRequest {
    /// Search both partitions with the default `k`.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            k: DEFAULT_K,
            include_reports: true,
            include_transcripts: true,
            document_ids: None,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_documents<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.document_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn reports_only(mut self) -> Self {
        self.include_reports = true;
        self.include_transcripts = false;
        self
    }

    pub fn transcripts_only(mut self) -> Self {
        self.include_reports = false;
        self.include_transcripts = true;
        self
    }
}

/// A retrieved chunk and its distance to the query.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub distance: f32,
    pub source_type: SourceType,
}

impl From<ScoredChunk> for RetrievedChunk {
    fn from(scored: ScoredChunk) -> Self {
        Self {
            source_type: scored.chunk.source_type,
            chunk: scored.chunk,
            distance: scored.distance,
        }
    }
}

/// Queries both partitions and merges the hits by distance.
pub struct Retriever {
    reports: Arc<EmbeddingIndex>,
    transcripts: Arc<EmbeddingIndex>,
}

impl Retriever {
    pub fn new(reports: Arc<EmbeddingIndex>, transcripts: Arc<EmbeddingIndex>) -> Self {
        Self {
            reports,
            transcripts,
        }
    }

    /// Up to `k` hits from each requested partition, ordered by ascending
    /// distance. Report and transcript distances are compared as-is.
    #[instrument(skip(self, request), fields(k = request.k))]
    pub async fn retrieve(&self, request: &RetrievalRequest) -> Result<Vec<RetrievedChunk>> {
        let filter = request.document_ids.as_ref();

        let (reports, transcripts) = futures::try_join!(
            async {
                if request.include_reports {
                    self.reports.query(&request.query, request.k, filter).await
                } else {
                    Ok(Vec::new())
                }
            },
            async {
                if request.include_transcripts {
                    self.transcripts.query(&request.query, request.k, filter).await
                } else {
                    Ok(Vec::new())
                }
            }
        )?;

        let mut results: Vec<RetrievedChunk> = reports
            .into_iter()
            .chain(transcripts)
            .map(RetrievedChunk::from)
            .collect();

        // Stable, so report hits precede transcript hits at equal distance.
        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        debug!("Retrieved {} chunks", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::TextSplitter;
    use crate::document::{Report, Transcript};
    use crate::embedding::HashingEmbedder;
    use crate::indexer::tests::partitions;
    use crate::indexer::DocumentIndexer;

    async fn setup() -> (DocumentIndexer, Retriever) {
        let (reports, transcripts) = partitions(Arc::new(HashingEmbedder::default())).await;
        (
            DocumentIndexer::new(reports.clone(), transcripts.clone(), TextSplitter::default()),
            Retriever::new(reports, transcripts),
        )
    }

    async fn populate(indexer: &DocumentIndexer) {
        let mut v1 = Report::new("v1", "Intro to X");
        v1.key_points = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        indexer.index_report(&v1).await.unwrap();

        let mut v2 = Report::new("v2", "Async Rust");
        v2.main_topics = vec!["tokio".to_string(), "futures".to_string()];
        indexer.index_report(&v2).await.unwrap();

        indexer
            .index_transcript(&Transcript::new("v1", "Intro to X", "today we look at B and why it matters"))
            .await
            .unwrap();
        indexer
            .index_transcript(&Transcript::new("v2", "Async Rust", "tokio runs futures on a scheduler"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_key_point_scenario() {
        let (indexer, retriever) = setup().await;
        populate(&indexer).await;

        let results = retriever
            .retrieve(&RetrievalRequest::new("What is B?").with_k(5).with_documents(["v1"]))
            .await
            .unwrap();

        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.chunk.document_id == "v1"));
        assert!(results.iter().any(|r| r.chunk.text.contains('B')));
    }

    #[tokio::test]
    async fn test_results_are_ordered_and_merged() {
        let (indexer, retriever) = setup().await;
        populate(&indexer).await;

        let results = retriever
            .retrieve(&RetrievalRequest::new("tokio futures"))
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert!(results.iter().any(|r| r.source_type == SourceType::Report));
        assert!(results.iter().any(|r| r.source_type == SourceType::Transcript));
        assert_eq!(results[0].chunk.document_id, "v2");
    }

    #[tokio::test]
    async fn test_partition_flags() {
        let (indexer, retriever) = setup().await;
        populate(&indexer).await;

        let reports = retriever
            .retrieve(&RetrievalRequest::new("B").reports_only())
            .await
            .unwrap();
        assert!(reports.iter().all(|r| r.source_type == SourceType::Report));
        assert_eq!(reports.len(), 2);

        let transcripts = retriever
            .retrieve(&RetrievalRequest::new("B").transcripts_only())
            .await
            .unwrap();
        assert!(transcripts.iter().all(|r| r.source_type == SourceType::Transcript));

        let mut neither = RetrievalRequest::new("B");
        neither.include_reports = false;
        neither.include_transcripts = false;
        assert!(retriever.retrieve(&neither).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_k_applies_per_partition() {
        let (indexer, retriever) = setup().await;
        populate(&indexer).await;

        let results = retriever
            .retrieve(&RetrievalRequest::new("rust").with_k(1))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_filter_correctness() {
        let (indexer, retriever) = setup().await;
        populate(&indexer).await;

        for query in ["B", "tokio", "nothing related"] {
            let results = retriever
                .retrieve(&RetrievalRequest::new(query).with_documents(["v2"]))
                .await
                .unwrap();
            assert!(results.iter().all(|r| r.chunk.document_id == "v2"));
        }

        let none = retriever
            .retrieve(&RetrievalRequest::new("B").with_documents(Vec::<String>::new()))
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
