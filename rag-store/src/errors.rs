//! Unified error types for the crate.

use thiserror::Error;

/// Top-level error for rag-store operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// I/O or filesystem errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors (with line context where available).
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// No index/collection exists for the requested country.
    #[error("unknown country: {0}")]
    UnknownCountry(String),

    /// Mismatch in vector dimensionality across records or against the query.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// An index record carries no embedding.
    #[error("record on line {line} has no embedding")]
    MissingEmbedding { line: usize },

    /// Query embedding failed (provider/network/credential).
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Qdrant client errors (wrapped).
    #[error("qdrant error: {0}")]
    Qdrant(String),

    /// A background loading task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl From<serde_json::Error> for RagError {
    fn from(e: serde_json::Error) -> Self {
        RagError::Parse(e.to_string())
    }
}
