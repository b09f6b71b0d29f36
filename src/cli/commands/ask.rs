//! Ask command implementation.

use super::{open_orchestrator, video_filter};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    videos: &[String],
    model: Option<&str>,
    settings: Settings,
) -> Result<()> {
    let orchestrator = open_orchestrator(settings).await?;
    let filter = video_filter(videos);

    let spinner = Output::spinner("Searching analyzed videos...");
    let result = orchestrator.ask(question, filter.as_ref(), model).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            println!("\n{}\n", response.format_for_display());
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
