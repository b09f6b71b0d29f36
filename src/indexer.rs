//! Turns reports and transcripts into chunks in the right partition.

use crate::chunking::TextSplitter;
use crate::document::{Report, SourceDocument, Transcript};
use crate::error::Result;
use crate::vector_store::{Chunk, EmbeddingIndex, SourceType};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Outcome of indexing one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub document_id: String,
    pub source_type: SourceType,
    pub chunks_indexed: usize,
    /// Chunks from the previous version of the document.
    pub chunks_removed: usize,
}

/// Outcome of a full rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReindexSummary {
    pub reports_indexed: usize,
    pub transcripts_indexed: usize,
    pub chunks_indexed: usize,
    pub chunks_cleared: usize,
}

/// Indexes documents into the report and transcript partitions.
pub struct DocumentIndexer {
    reports: Arc<EmbeddingIndex>,
    transcripts: Arc<EmbeddingIndex>,
    splitter: TextSplitter,
}

impl DocumentIndexer {
    pub fn new(
        reports: Arc<EmbeddingIndex>,
        transcripts: Arc<EmbeddingIndex>,
        splitter: TextSplitter,
    ) -> Self {
        Self {
            reports,
            transcripts,
            splitter,
        }
    }

    fn partition(&self, source_type: SourceType) -> &EmbeddingIndex {
        match source_type {
            SourceType::Report => &self.reports,
            SourceType::Transcript => &self.transcripts,
        }
    }

    /// Split `text` and label every piece with its position and document.
    pub fn build_chunks(
        &self,
        document_id: &str,
        title: &str,
        text: &str,
        source_type: SourceType,
    ) -> Vec<Chunk> {
        let pieces = self.splitter.split(text);
        let total = pieces.len() as u32;

        pieces
            .into_iter()
            .enumerate()
            .map(|(i, piece)| Chunk::new(document_id, title, piece, i as u32, total, source_type))
            .collect()
    }

    /// Index a report, replacing any chunks of its previous version.
    #[instrument(skip(self, report), fields(document_id = %report.document_id))]
    pub async fn index_report(&self, report: &Report) -> Result<IndexSummary> {
        report.validate()?;

        let chunks = self.build_chunks(
            &report.document_id,
            &report.title,
            &report.to_index_text(),
            SourceType::Report,
        );
        self.replace(&report.document_id, chunks, SourceType::Report)
            .await
    }

    /// Index a transcript's raw text, replacing any previous chunks.
    #[instrument(skip(self, transcript), fields(document_id = %transcript.document_id))]
    pub async fn index_transcript(&self, transcript: &Transcript) -> Result<IndexSummary> {
        transcript.validate()?;

        let chunks = self.build_chunks(
            &transcript.document_id,
            &transcript.title,
            &transcript.text,
            SourceType::Transcript,
        );
        self.replace(&transcript.document_id, chunks, SourceType::Transcript)
            .await
    }

    pub async fn index_document(&self, document: &SourceDocument) -> Result<IndexSummary> {
        match document {
            SourceDocument::Report(report) => self.index_report(report).await,
            SourceDocument::Transcript(transcript) => self.index_transcript(transcript).await,
        }
    }

    async fn replace(
        &self,
        document_id: &str,
        chunks: Vec<Chunk>,
        source_type: SourceType,
    ) -> Result<IndexSummary> {
        let chunks_indexed = chunks.len();
        let chunks_removed = self
            .partition(source_type)
            .replace_document(document_id, chunks)
            .await?;

        info!(
            "Indexed {} {} in {} chunks ({} replaced)",
            source_type, document_id, chunks_indexed, chunks_removed
        );

        Ok(IndexSummary {
            document_id: document_id.to_string(),
            source_type,
            chunks_indexed,
            chunks_removed,
        })
    }

    /// Clear both partitions, then index every document in order.
    ///
    /// Stops at the first failure; documents before it stay indexed.
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    pub async fn reindex_all(&self, documents: &[SourceDocument]) -> Result<ReindexSummary> {
        let mut summary = ReindexSummary {
            chunks_cleared: self.reports.clear().await? + self.transcripts.clear().await?,
            ..ReindexSummary::default()
        };

        for document in documents {
            let indexed = self.index_document(document).await?;
            summary.chunks_indexed += indexed.chunks_indexed;
            match indexed.source_type {
                SourceType::Report => summary.reports_indexed += 1,
                SourceType::Transcript => summary.transcripts_indexed += 1,
            }
        }

        info!(
            "Reindexed {} reports and {} transcripts ({} chunks)",
            summary.reports_indexed, summary.transcripts_indexed, summary.chunks_indexed
        );
        Ok(summary)
    }
}
