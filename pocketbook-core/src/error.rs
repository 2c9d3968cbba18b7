//! Error types for pocketbook.

use thiserror::Error;

/// Errors that can occur in pocketbook operations.
#[derive(Error, Debug)]
pub enum PocketError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("No {0} ids left to assign")]
    IdsExhausted(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PocketError {
    fn from(err: serde_json::Error) -> Self {
        PocketError::Serialization(err.to_string())
    }
}

impl PocketError {
    /// True when the error means the backing file simply isn't there yet.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, PocketError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Result type alias for pocketbook operations.
pub type PocketResult<T> = Result<T, PocketError>;
