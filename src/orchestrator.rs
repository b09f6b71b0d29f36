//! Pipeline orchestrator for Vidsage.
//!
//! Wires settings, embedder and partitions into the indexer, retriever and
//! context assembler, and exposes the operations the CLI and answer
//! synthesis use.

use crate::cache::{MemoryReportCache, ReportCache};
use crate::chunking::{ChunkingConfig, TextSplitter};
use crate::config::{Prompts, Settings};
use crate::document::{Report, SourceDocument, Transcript};
use crate::embedding::{create_embedder, Embedder};
use crate::error::{Result, VidsageError};
use crate::indexer::{DocumentIndexer, IndexSummary, ReindexSummary};
use crate::library::DocumentLibrary;
use crate::rag::{ContextAssembler, QaAgent, QaResponse};
use crate::retriever::{RetrievalRequest, RetrievedChunk, Retriever};
use crate::vector_store::{
    DocumentFilter, EmbeddingIndex, IndexedDocument, MemoryVectorStore, SourceType,
    SqliteVectorStore, VectorStore,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The main orchestrator for the Vidsage pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    embedder: Arc<dyn Embedder>,
    reports: Arc<EmbeddingIndex>,
    transcripts: Arc<EmbeddingIndex>,
    indexer: DocumentIndexer,
    retriever: Arc<Retriever>,
    assembler: ContextAssembler,
    library: DocumentLibrary,
}

impl Orchestrator {
    /// Create an orchestrator from settings.
    ///
    /// Fails with a configuration error if the embedder, chunker or vector
    /// store cannot be set up.
    pub async fn new(settings: Settings) -> Result<Self> {
        // Load prompts (with optional custom directory and variables)
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder = create_embedder(&settings.embedding)?;
        info!(
            "Using embedder {} ({} dimensions)",
            embedder.fingerprint(),
            embedder.dimensions()
        );

        let (report_store, transcript_store): (Arc<dyn VectorStore>, Arc<dyn VectorStore>) =
            match settings.vector_store.provider.as_str() {
                "sqlite" => {
                    let path = settings.sqlite_path();
                    (
                        Arc::new(SqliteVectorStore::open(&path, SourceType::Report)?),
                        Arc::new(SqliteVectorStore::open(&path, SourceType::Transcript)?),
                    )
                }
                "memory" => (
                    Arc::new(MemoryVectorStore::new(SourceType::Report)),
                    Arc::new(MemoryVectorStore::new(SourceType::Transcript)),
                ),
                other => {
                    return Err(VidsageError::Configuration(format!(
                        "Unknown vector store provider: {} (expected sqlite or memory)",
                        other
                    )))
                }
            };

        Self::with_components(
            settings,
            prompts,
            embedder,
            report_store,
            transcript_store,
            Arc::new(MemoryReportCache::new()),
        )
        .await
    }

    /// Create an orchestrator with custom components.
    pub async fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        report_store: Arc<dyn VectorStore>,
        transcript_store: Arc<dyn VectorStore>,
        cache: Arc<dyn ReportCache>,
    ) -> Result<Self> {
        if report_store.source_type() != SourceType::Report
            || transcript_store.source_type() != SourceType::Transcript
        {
            return Err(VidsageError::Configuration(
                "vector stores were given for the wrong partitions".to_string(),
            ));
        }

        let splitter = TextSplitter::with_config(ChunkingConfig::from(&settings.chunking))?;

        let reports = Arc::new(EmbeddingIndex::open(report_store, embedder.clone()).await?);
        let transcripts =
            Arc::new(EmbeddingIndex::open(transcript_store, embedder.clone()).await?);

        let indexer = DocumentIndexer::new(reports.clone(), transcripts.clone(), splitter);
        let retriever = Arc::new(Retriever::new(reports.clone(), transcripts.clone()));
        let assembler = ContextAssembler::new(retriever.clone()).with_k(settings.retrieval.context_k);
        let library = DocumentLibrary::new(settings.data_dir(), cache);

        Ok(Self {
            settings,
            prompts,
            embedder,
            reports,
            transcripts,
            indexer,
            retriever,
            assembler,
            library,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a reference to the embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    pub fn library(&self) -> &DocumentLibrary {
        &self.library
    }

    /// Partitions whose vectors came from a different embedder.
    pub fn stale_partitions(&self) -> Vec<SourceType> {
        [&self.reports, &self.transcripts]
            .into_iter()
            .filter(|index| index.is_stale())
            .map(|index| index.source_type())
            .collect()
    }

    /// Index a report, replacing its previous chunks.
    pub async fn index_report(&self, report: &Report) -> Result<IndexSummary> {
        self.indexer.index_report(report).await
    }

    /// Index a transcript, replacing its previous chunks.
    pub async fn index_transcript(
        &self,
        document_id: &str,
        title: &str,
        text: &str,
    ) -> Result<IndexSummary> {
        self.indexer
            .index_transcript(&Transcript::new(document_id, title, text))
            .await
    }

    /// Save a report (and optionally its transcript) to the library and index them.
    #[instrument(skip(self, report, transcript), fields(document_id = %report.document_id))]
    pub async fn import(&self, report: &Report, transcript: Option<&str>) -> Result<Vec<IndexSummary>> {
        report.validate()?;
        let transcript = transcript.map(|text| Transcript::new(&report.document_id, &report.title, text));
        if let Some(transcript) = &transcript {
            transcript.validate()?;
        }

        let mut summaries = vec![self.indexer.index_report(report).await?];
        self.library.save_report(report)?;

        if let Some(transcript) = transcript {
            summaries.push(self.indexer.index_transcript(&transcript).await?);
            self.library.save_transcript(&transcript)?;
        }

        Ok(summaries)
    }

    /// Index a report only if its partition has no chunks for it.
    pub async fn ensure_report_indexed(&self, report: &Report) -> Result<Option<IndexSummary>> {
        if self.reports.contains_document(&report.document_id).await? {
            return Ok(None);
        }
        self.index_report(report).await.map(Some)
    }

    /// Index a transcript only if its partition has no chunks for it.
    pub async fn ensure_transcript_indexed(
        &self,
        document_id: &str,
        title: &str,
        text: &str,
    ) -> Result<Option<IndexSummary>> {
        if self.transcripts.contains_document(document_id).await? {
            return Ok(None);
        }
        self.index_transcript(document_id, title, text).await.map(Some)
    }

    /// Make sure library documents are indexed before answering.
    ///
    /// Covers the filtered documents, or the whole library without a filter.
    /// Returns the number of documents that had to be indexed.
    #[instrument(skip(self, document_ids))]
    pub async fn ensure_library_indexed(&self, document_ids: Option<&DocumentFilter>) -> Result<usize> {
        let ids = match document_ids {
            Some(ids) => ids.clone(),
            None => self.library.document_ids()?,
        };

        let mut indexed = 0;
        for id in &ids {
            let report = match self.library.load_report(id) {
                Ok(report) => report,
                Err(e) => {
                    warn!("Skipping report {}: {}", id, e);
                    None
                }
            };

            if let Some(report) = &report {
                if self.ensure_report_indexed(report).await?.is_some() {
                    indexed += 1;
                }
            }

            let transcript = match self.library.load_transcript(id) {
                Ok(transcript) => transcript,
                Err(e) => {
                    warn!("Skipping transcript {}: {}", id, e);
                    None
                }
            };

            if let Some(transcript) = transcript {
                if self
                    .ensure_transcript_indexed(&transcript.document_id, &transcript.title, &transcript.text)
                    .await?
                    .is_some()
                {
                    indexed += 1;
                }
            }
        }

        if indexed > 0 {
            info!("Indexed {} library documents on demand", indexed);
        }
        Ok(indexed)
    }

    /// Raw similarity search over both partitions.
    pub async fn retrieve(&self, request: &RetrievalRequest) -> Result<Vec<RetrievedChunk>> {
        self.retriever.retrieve(request).await
    }

    /// Context block for answer synthesis, or the no-information sentinel.
    pub async fn get_context_for_query(
        &self,
        query: &str,
        document_ids: Option<&DocumentFilter>,
    ) -> Result<String> {
        self.assembler.assemble(query, document_ids).await
    }

    /// Answer a question from the indexed videos.
    ///
    /// The model is only contacted when retrieval found something. An empty
    /// index gets its own answer, distinct from a query with no matches.
    #[instrument(skip(self, document_ids, model))]
    pub async fn ask(
        &self,
        question: &str,
        document_ids: Option<&DocumentFilter>,
        model: Option<&str>,
    ) -> Result<QaResponse> {
        self.ensure_library_indexed(document_ids).await?;

        if self.chunk_counts().await? == (0, 0) {
            return Ok(QaResponse::no_videos());
        }

        let context = self.assembler.gather(question, document_ids).await?;
        if context.is_empty() {
            return Ok(QaResponse::no_information());
        }

        let mut agent = QaAgent::new(&self.settings.rag, self.prompts.clone())?;
        if let Some(model) = model {
            agent = agent.with_model(model);
        }
        agent.answer(question, &context).await
    }

    /// Clear both partitions and index the given documents.
    pub async fn reindex_all(&self, documents: &[SourceDocument]) -> Result<ReindexSummary> {
        self.indexer.reindex_all(documents).await
    }

    /// Rebuild both partitions from the document library.
    pub async fn reindex_library(&self) -> Result<ReindexSummary> {
        let documents = self.library.load_all()?;
        info!(
            "Reindexing {} documents from {:?}",
            documents.len(),
            self.library.dir()
        );
        self.reindex_all(&documents).await
    }

    /// Indexed documents in both partitions, reports first.
    pub async fn list_documents(&self) -> Result<Vec<IndexedDocument>> {
        let mut documents = self.reports.list_documents().await?;
        documents.extend(self.transcripts.list_documents().await?);
        Ok(documents)
    }

    /// Chunk counts as (reports, transcripts).
    pub async fn chunk_counts(&self) -> Result<(usize, usize)> {
        Ok((
            self.reports.chunk_count().await?,
            self.transcripts.chunk_count().await?,
        ))
    }
}
