//! Search command implementation.

use super::{open_orchestrator, video_filter};
use crate::cli::Output;
use crate::config::Settings;
use crate::retriever::RetrievalRequest;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    k: Option<usize>,
    reports_only: bool,
    transcripts_only: bool,
    videos: &[String],
    settings: Settings,
) -> Result<()> {
    let k = k.unwrap_or(settings.retrieval.default_k);
    let orchestrator = open_orchestrator(settings).await?;

    let mut request = RetrievalRequest::new(query).with_k(k);
    request.document_ids = video_filter(videos);
    if reports_only {
        request = request.reports_only();
    } else if transcripts_only {
        request = request.transcripts_only();
    }

    let spinner = Output::spinner("Searching...");
    let results = orchestrator.retrieve(&request).await;
    spinner.finish_and_clear();

    match results {
        Ok(chunks) => {
            if chunks.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results", chunks.len()));

                for retrieved in &chunks {
                    Output::search_result(
                        &retrieved.chunk.document_title,
                        &retrieved.chunk.document_id,
                        retrieved.source_type.as_str(),
                        retrieved.distance,
                        &retrieved.chunk.text,
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
