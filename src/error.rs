//! Error handling for recookie

use thiserror::Error;

/// Main error type for recookie operations
#[derive(Error, Debug)]
pub enum RecookieError {
    #[error("Cookie store error: {0}")]
    Store(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Synced {written} of {matched} cookies")]
    SyncIncomplete { matched: usize, written: usize },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type alias for recookie operations
pub type Result<T> = std::result::Result<T, RecookieError>;
