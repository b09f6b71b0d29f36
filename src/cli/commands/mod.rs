//! CLI command implementations.

mod ask;
mod config;
mod context;
mod index;
mod list;
mod reindex;
mod search;

pub use ask::run_ask;
pub use config::run_config;
pub use context::run_context;
pub use index::{run_index, run_index_transcript};
pub use list::run_list;
pub use reindex::run_reindex;
pub use search::run_search;

use crate::cli::Output;
use crate::config::Settings;
use crate::indexer::IndexSummary;
use crate::orchestrator::Orchestrator;
use crate::vector_store::DocumentFilter;
use anyhow::Result;

/// Open the orchestrator, warning about partitions built with another embedder.
async fn open_orchestrator(settings: Settings) -> Result<Orchestrator> {
    let orchestrator = Orchestrator::new(settings).await?;

    let stale = orchestrator.stale_partitions();
    if !stale.is_empty() {
        let names: Vec<&str> = stale.iter().map(|s| s.partition()).collect();
        Output::warning(&format!(
            "The {} index was built with a different embedding model. Run 'vidsage reindex' to rebuild it.",
            names.join(" and ")
        ));
    }

    Ok(orchestrator)
}

/// Repeated `--video` flags as a filter; none means every document.
fn video_filter(videos: &[String]) -> Option<DocumentFilter> {
    if videos.is_empty() {
        None
    } else {
        Some(videos.iter().cloned().collect())
    }
}

fn print_summary(summary: &IndexSummary) {
    let mut line = format!("{} chunks", summary.chunks_indexed);
    if summary.chunks_removed > 0 {
        line.push_str(&format!(", replaced {}", summary.chunks_removed));
    }
    Output::kv(summary.source_type.as_str(), &line);
}
