//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored timestamp could not be parsed.
    #[error("Timestamp parse error: {0}")]
    Timestamp(#[from] chrono::ParseError),

    /// HTTP call to an external collaborator failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Content store could not produce the requested blob.
    #[error("Content store error: {0}")]
    Storage(String),

    /// None of the resolution strategies matched the sender.
    #[error("Unknown newsletter sender: {sender_email}")]
    UnknownSource {
        /// Verbatim sender address of the rejected message.
        sender_email: String,
        /// Content key of the rejected message.
        content_key: String,
    },

    /// A record with this content key already exists.
    ///
    /// Benign for ingestion retries; the storage uniqueness constraint
    /// is what enforces at-most-once persistence.
    #[error("Duplicate record for content key: {0}")]
    DuplicateRecord(String),

    /// No persisted record exists for this content key.
    #[error("Record not found for content key: {0}")]
    RecordNotFound(String),

    /// Referenced newsletter source does not exist.
    #[error("Newsletter source not found: {0}")]
    SourceNotFound(i64),

    /// Summarization oracle returned an unusable payload.
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error is the benign duplicate-ingest rejection.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateRecord(_))
    }
}
