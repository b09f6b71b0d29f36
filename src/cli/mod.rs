//! CLI module for Vidsage.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Vidsage - semantic search and Q&A over video transcripts and analysis reports
///
/// Indexes AI analysis reports and raw transcripts into a local vector store and
/// answers questions from the most relevant passages.
#[derive(Parser, Debug)]
#[command(name = "vidsage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "VIDSAGE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level from `-v` flags, falling back to the configured one.
    pub fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        match self.verbose {
            0 => configured,
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index an analysis report (JSON), optionally with its transcript
    Index {
        /// Path to the report JSON file
        report: String,

        /// Path to the video's transcript text file
        #[arg(short, long)]
        transcript: Option<String>,
    },

    /// Index a transcript on its own
    IndexTranscript {
        /// Video ID
        video_id: String,

        /// Video title
        title: String,

        /// Path to the transcript text file
        file: String,
    },

    /// Rebuild the index from every document in the data directory
    Reindex,

    /// Search for relevant report and transcript passages
    Search {
        /// Search query
        query: String,

        /// Results per partition
        #[arg(short = 'k', long = "top-k")]
        k: Option<usize>,

        /// Only search analysis reports
        #[arg(long, conflicts_with = "transcripts_only")]
        reports_only: bool,

        /// Only search transcripts
        #[arg(long)]
        transcripts_only: bool,

        /// Restrict to a video (repeatable)
        #[arg(long = "video")]
        videos: Vec<String>,
    },

    /// Print the context block that would be used to answer a question
    Context {
        /// The question or query
        query: String,

        /// Restrict to a video (repeatable)
        #[arg(long = "video")]
        videos: Vec<String>,
    },

    /// Ask a question and get an answer from the analyzed videos
    Ask {
        /// The question to ask
        question: String,

        /// Restrict to a video (repeatable)
        #[arg(long = "video")]
        videos: Vec<String>,

        /// LLM model to use for response generation
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List indexed documents
    List,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
