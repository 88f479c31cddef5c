//! Error types for itemrag
//!
//! Collaborator failures are surfaced as `RagError` values and absorbed by
//! the pipeline stages; only configuration and argument errors reach callers.

use thiserror::Error;

/// Main error type for the RAG pipeline and its collaborators
#[derive(Error, Debug)]
pub enum RagError {
    /// Optimization or answering agent errors
    #[error("Agent error: {0}")]
    Agent(String),

    /// Knowledge store errors
    #[error("Knowledge store error: {0}")]
    Store(String),

    /// Response could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout errors
    #[error("{stage} timed out after {duration_ms}ms")]
    Timeout { stage: String, duration_ms: u64 },

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;

/// Convert anyhow errors to RagError
impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Generic(err.to_string())
    }
}
