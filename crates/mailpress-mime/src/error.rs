//! Error types for MIME parsing.

use thiserror::Error;

/// Errors that can occur while decoding a MIME message.
#[derive(Debug, Error)]
pub enum Error {
    /// Message structure could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Content-Type header is malformed.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Transfer or header encoding is malformed.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decoding failed.
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
