//! Error types for Vidsage.

use thiserror::Error;

/// Library-level error type for Vidsage operations.
#[derive(Error, Debug)]
pub enum VidsageError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Indexing failed: {0}")]
    Indexing(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("RAG error: {0}")]
    Rag(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Report cache error: {0}")]
    Cache(String),
}

impl VidsageError {
    /// Whether the embedding backend could not produce vectors.
    pub fn is_embedding_unavailable(&self) -> bool {
        matches!(self, VidsageError::Embedding(_) | VidsageError::OpenAI(_))
    }

    /// Classify a failure raised while mutating a partition.
    ///
    /// Embedding, configuration and document errors keep their own kind.
    pub(crate) fn into_indexing(self) -> Self {
        match self {
            e @ (VidsageError::Configuration(_)
            | VidsageError::Embedding(_)
            | VidsageError::OpenAI(_)
            | VidsageError::MalformedDocument(_)
            | VidsageError::Indexing(_)) => e,
            other => VidsageError::Indexing(other.to_string()),
        }
    }

    /// Classify a failure raised while searching a partition.
    pub(crate) fn into_query(self) -> Self {
        match self {
            e @ (VidsageError::Configuration(_)
            | VidsageError::Embedding(_)
            | VidsageError::OpenAI(_)
            | VidsageError::Query(_)) => e,
            other => VidsageError::Query(other.to_string()),
        }
    }
}

/// Result type alias for Vidsage operations.
pub type Result<T> = std::result::Result<T, VidsageError>;
