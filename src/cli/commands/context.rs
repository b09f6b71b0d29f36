//! Context command implementation.

use super::{open_orchestrator, video_filter};
use crate::config::Settings;
use anyhow::Result;

/// Run the context command: print the assembled context for a query.
pub async fn run_context(query: &str, videos: &[String], settings: Settings) -> Result<()> {
    let orchestrator = open_orchestrator(settings).await?;
    let filter = video_filter(videos);

    let context = orchestrator
        .get_context_for_query(query, filter.as_ref())
        .await?;
    println!("{}", context);

    Ok(())
}
