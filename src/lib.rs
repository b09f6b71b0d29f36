//! Vidsage - Retrieval over Video Transcripts and Analysis Reports
//!
//! A local-first library and CLI that indexes AI-generated video analysis reports
//! and raw transcripts, then finds the passages most relevant to a question.
//!
//! # Overview
//!
//! Vidsage allows you to:
//! - Split reports and transcripts into overlapping chunks and embed them
//! - Keep reports and transcripts in separate, independently queryable partitions
//! - Search both partitions at once, optionally restricted to specific videos
//! - Assemble a context block grouped by video for a language model
//! - Ask questions and get answers with the videos they came from
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `document` - Report and transcript models
//! - `chunking` - Recursive text splitting
//! - `embedding` - Embedding generation
//! - `vector_store` - Storage backends and the per-partition embedding index
//! - `indexer` - Document chunking and indexing
//! - `retriever` - Cross-partition retrieval
//! - `rag` - Context assembly and question answering
//! - `library` - On-disk document library
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use vidsage::config::Settings;
//! use vidsage::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings).await?;
//!
//!     let context = orchestrator
//!         .get_context_for_query("What did they say about error handling?", None)
//!         .await?;
//!     println!("{}", context);
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod library;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod retriever;
pub mod vector_store;

pub use error::{Result, VidsageError};
