//! Error types for the NSS query pipeline.
//!
//! One enum covers every failure category the pipeline can surface. Stage
//! code picks the variant that names the collaborator that failed, so the
//! CLI and the HTTP layer can report it without string matching.

use thiserror::Error;

/// Unified error type for the NSS query pipeline.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Language model endpoint errors (transport, status, empty body)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding endpoint errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector store errors (open, search, aggregation)
    #[error("Store error: {0}")]
    Store(String),

    /// Prompt loading and rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// The caller supplied a query the pipeline refuses to run
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Short machine-readable category, used in JSON error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::Io(_) => "io_error",
            AppError::Llm(_) => "llm_error",
            AppError::Embedding(_) => "embedding_error",
            AppError::Store(_) => "store_error",
            AppError::Prompt(_) => "prompt_error",
            AppError::InvalidQuery(_) => "invalid_query",
            AppError::Serialization(_) => "serialization_error",
            AppError::Other(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
