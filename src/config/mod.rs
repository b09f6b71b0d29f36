//! Configuration module for Vidsage.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, QaPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingProvider, EmbeddingSettings, GeneralSettings, PromptSettings,
    RagSettings, RetrievalSettings, Settings, VectorStoreSettings,
};
