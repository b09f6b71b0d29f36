//! Reindex command implementation.

use super::open_orchestrator;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the reindex command.
pub async fn run_reindex(settings: Settings) -> Result<()> {
    let orchestrator = open_orchestrator(settings).await?;

    let spinner = Output::spinner(&format!(
        "Rebuilding index from {}...",
        orchestrator.library().dir().display()
    ));
    let result = orchestrator.reindex_library().await;
    spinner.finish_and_clear();

    match result {
        Ok(summary) => {
            Output::success("Index rebuilt");
            Output::kv("Reports", &summary.reports_indexed.to_string());
            Output::kv("Transcripts", &summary.transcripts_indexed.to_string());
            Output::kv("Chunks indexed", &summary.chunks_indexed.to_string());
            Output::kv("Chunks cleared", &summary.chunks_cleared.to_string());
        }
        Err(e) => {
            Output::error(&format!("Reindex failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
