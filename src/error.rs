//! Error types for the mentor service

use thiserror::Error;

/// Result type alias for mentor operations
pub type Result<T> = std::result::Result<T, MentorError>;

#[derive(Error, Debug)]
pub enum MentorError {

    // =============================
    // Request Errors
    // =============================

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // Retrieval Errors (recoverable)
    // =============================

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector search error: {0}")]
    VectorSearch(String),

    #[error("Retrieval timed out after {0}s")]
    RetrievalTimeout(u64),

    // =============================
    // Completion Errors (fatal to the request)
    // =============================

    #[error("Completion service error: {message}")]
    Completion {
        status: Option<u16>,
        message: String,
    },

    #[error("Completion service timed out after {0}s")]
    CompletionTimeout(u64),

    #[error("Model kept requesting tools after {0} rounds")]
    MaxToolRounds(u32),

    #[error("Request cancelled")]
    Cancelled,

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MentorError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn completion(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Completion {
            status,
            message: message.into(),
        }
    }

    /// True for errors caused by the caller's input rather than a collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
