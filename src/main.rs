//! Vidsage CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vidsage::cli::{commands, Cli, Commands};
use vidsage::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&Settings::expand_path(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging
    let log_level = cli.log_level(&settings.general.log_level);

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("vidsage={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    std::fs::create_dir_all(settings.data_dir())?;

    match &cli.command {
        Commands::Index { report, transcript } => {
            commands::run_index(report, transcript.as_deref(), settings).await?;
        }

        Commands::IndexTranscript { video_id, title, file } => {
            commands::run_index_transcript(video_id, title, file, settings).await?;
        }

        Commands::Reindex => {
            commands::run_reindex(settings).await?;
        }

        Commands::Search {
            query,
            k,
            reports_only,
            transcripts_only,
            videos,
        } => {
            commands::run_search(query, *k, *reports_only, *transcripts_only, videos, settings).await?;
        }

        Commands::Context { query, videos } => {
            commands::run_context(query, videos, settings).await?;
        }

        Commands::Ask {
            question,
            videos,
            model,
        } => {
            commands::run_ask(question, videos, model.as_deref(), settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, cli.config.as_deref(), settings)?;
        }
    }

    Ok(())
}
