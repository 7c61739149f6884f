//! Error types for SqlMail

use thiserror::Error;

/// Main error type for SqlMail
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Message size {size} exceeds append limit of {limit} bytes")]
    LimitExceeded { size: u64, limit: u64 },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Malformed message content: {0}")]
    MalformedContent(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for SqlMail
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error refers to a missing mailbox or account.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
