//! Error types for Scout.

use thiserror::Error;

/// Library-level error type for Scout operations.
#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Language model error: {0}")]
    LanguageModel(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Web search failed: {0}")]
    Search(String),

    #[error("Provider API error: {0}")]
    Provider(String),

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

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session {0} is still processing a message")]
    SessionBusy(String),
}

impl ScoutError {
    /// Whether the failure is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScoutError::Provider(_) => true,
            ScoutError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ScoutError::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// Result type alias for Scout operations.
pub type Result<T> = std::result::Result<T, ScoutError>;
