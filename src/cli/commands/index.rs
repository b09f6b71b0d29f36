//! Index commands implementation.

use super::{open_orchestrator, print_summary};
use crate::cli::Output;
use crate::config::Settings;
use crate::document::Report;
use anyhow::{Context, Result};

/// Run the index command: store a report (and transcript) in the library and index it.
pub async fn run_index(report_path: &str, transcript_path: Option<&str>, settings: Settings) -> Result<()> {
    let content = std::fs::read_to_string(report_path)
        .with_context(|| format!("Failed to read report {}", report_path))?;
    let report = Report::from_json_str(&content)?;

    let transcript = transcript_path
        .map(|path| {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read transcript {}", path))
        })
        .transpose()?;

    let orchestrator = open_orchestrator(settings).await?;

    let spinner = Output::spinner(&format!("Indexing {}...", report.title));
    let result = orchestrator.import(&report, transcript.as_deref()).await;
    spinner.finish_and_clear();

    match result {
        Ok(summaries) => {
            Output::success(&format!("Indexed \"{}\" ({})", report.title, report.document_id));
            for summary in &summaries {
                print_summary(summary);
            }
        }
        Err(e) => {
            Output::error(&format!("Indexing failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

/// Run the index-transcript command.
pub async fn run_index_transcript(video_id: &str, title: &str, file: &str, settings: Settings) -> Result<()> {
    let text = std::fs::read_to_string(file).with_context(|| format!("Failed to read transcript {}", file))?;

    let orchestrator = open_orchestrator(settings).await?;

    let spinner = Output::spinner(&format!("Indexing transcript for {}...", title));
    let result = orchestrator.index_transcript(video_id, title, &text).await;
    spinner.finish_and_clear();

    let summary = result.map_err(|e| {
        Output::error(&format!("Indexing failed: {}", e));
        e
    })?;

    Output::success(&format!("Indexed transcript \"{}\" ({})", title, video_id));
    print_summary(&summary);
    Ok(())
}
