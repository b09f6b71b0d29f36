//! List command implementation.

use super::open_orchestrator;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let orchestrator = open_orchestrator(settings).await?;

    match orchestrator.list_documents().await {
        Ok(documents) => {
            if documents.is_empty() {
                Output::info("Nothing indexed yet. Use 'vidsage index <report.json>' to add content.");
            } else {
                Output::header(&format!("Indexed Documents ({})", documents.len()));
                println!();

                for document in &documents {
                    Output::document_info(
                        &document.document_title,
                        &document.document_id,
                        document.source_type.as_str(),
                        document.chunk_count,
                    );
                }

                let total_chunks: u32 = documents.iter().map(|d| d.chunk_count).sum();
                println!();
                Output::kv("Total documents", &documents.len().to_string());
                Output::kv("Total chunks", &total_chunks.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list documents: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
