//! Error types for mediarip core

use thiserror::Error;

/// Errors that can occur in mediarip core
#[derive(Debug, Error)]
pub enum MediaripError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The item exists but cannot be streamed (no usable quality, or the
    /// server answered with an error payload instead of media)
    #[error("Not streamable: {0}")]
    NotStreamable(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Client is not logged in")]
    NotLoggedIn,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Cipher error: {0}")]
    Cipher(String),

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

pub type Result<T> = std::result::Result<T, MediaripError>;

impl MediaripError {
    /// Check if this error is retryable
    ///
    /// The core never retries on its own; this only helps callers that
    /// layer their own retry policy on top.
    pub fn is_retryable(&self) -> bool {
        match self {
            MediaripError::Network(e) => {
                if let Some(status) = e.status() {
                    status.is_server_error()
                } else {
                    e.is_timeout() || e.is_connect()
                }
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_are_not_retryable() {
        assert!(!MediaripError::NotStreamable("gone".into()).is_retryable());
        assert!(!MediaripError::NotLoggedIn.is_retryable());
    }

    #[test]
    fn not_streamable_message() {
        let err = MediaripError::NotStreamable("not found".into());
        assert_eq!(err.to_string(), "Not streamable: not found");
    }
}
