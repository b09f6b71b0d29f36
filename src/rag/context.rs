//! Context assembly for question answering.

use crate::error::Result;
use crate::retriever::{RetrievalRequest, RetrievedChunk, Retriever};
use crate::vector_store::{DocumentFilter, SourceType};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Returned instead of a context block when nothing matched.
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found.";

/// Default number of hits requested from each partition.
pub const DEFAULT_CONTEXT_K: usize = 15;

const CONTEXT_HEADER: &str = "Information from analyzed videos:\n\n";
const DOCUMENT_SEPARATOR_WIDTH: usize = 50;

/// Retrieved context, rendered and raw.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub text: String,
    pub chunks: Vec<RetrievedChunk>,
}

impl AssembledContext {
    /// Whether nothing relevant was found.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Builds the text block handed to answer synthesis.
pub struct ContextAssembler {
    retriever: Arc<Retriever>,
    k: usize,
}

impl ContextAssembler {
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self {
            retriever,
            k: DEFAULT_CONTEXT_K,
        }
    }

    /// Set the number of hits requested from each partition.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Context for `query`, or [`NO_RELEVANT_INFORMATION`] if nothing matched.
    pub async fn assemble(&self, query: &str, document_ids: Option<&DocumentFilter>) -> Result<String> {
        Ok(self.gather(query, document_ids).await?.text)
    }

    /// Like [`assemble`](Self::assemble), keeping the retrieved chunks.
    #[instrument(skip(self, query, document_ids))]
    pub async fn gather(
        &self,
        query: &str,
        document_ids: Option<&DocumentFilter>,
    ) -> Result<AssembledContext> {
        let mut request = RetrievalRequest::new(query).with_k(self.k);
        request.document_ids = document_ids.cloned();

        let chunks = self.retriever.retrieve(&request).await?;
        debug!("Assembling context from {} chunks", chunks.len());

        Ok(AssembledContext {
            text: format_context(&chunks),
            chunks,
        })
    }
}

struct DocumentGroup<'a> {
    document_id: &'a str,
    title: &'a str,
    reports: Vec<&'a str>,
    transcripts: Vec<&'a str>,
}

/// Render retrieved chunks grouped by document.
///
/// Documents appear in the order of their first chunk in `chunks`; within a
/// document, report chunks come before transcript excerpts.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return NO_RELEVANT_INFORMATION.to_string();
    }

    let mut groups: Vec<DocumentGroup<'_>> = Vec::new();
    for retrieved in chunks {
        let chunk = &retrieved.chunk;
        let position = match groups.iter().position(|g| g.document_id == chunk.document_id) {
            Some(position) => position,
            None => {
                groups.push(DocumentGroup {
                    document_id: &chunk.document_id,
                    title: &chunk.document_title,
                    reports: Vec::new(),
                    transcripts: Vec::new(),
                });
                groups.len() - 1
            }
        };

        let group = &mut groups[position];
        match retrieved.source_type {
            SourceType::Report => group.reports.push(&chunk.text),
            SourceType::Transcript => group.transcripts.push(&chunk.text),
        }
    }

    let mut context = String::from(CONTEXT_HEADER);
    for group in groups {
        context.push_str(&format!("Video: {} (ID: {})\n", group.title, group.document_id));

        if !group.reports.is_empty() {
            context.push_str("\nReport analysis:\n");
            for text in &group.reports {
                context.push_str(text);
                context.push('\n');
            }
        }

        if !group.transcripts.is_empty() {
            context.push_str("\nTranscript excerpts:\n");
            for (i, text) in group.transcripts.iter().enumerate() {
                context.push_str(&format!("Excerpt {}: {}\n", i + 1, text));
            }
        }

        context.push('\n');
        context.push_str(&"-".repeat(DOCUMENT_SEPARATOR_WIDTH));
        context.push('\n');
    }

    context
}
