//! Transport-specific error types.
//!
//! These are connection-level failures. They are never a verdict about the
//! server under test and are reported separately from failed checks.

use thiserror::Error;

/// Errors that can occur while sending a request.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to connect to the server.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The request could not be built (bad header name, malformed URL, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The configured proxy is unusable.
    #[error("invalid proxy `{url}`: {message}")]
    InvalidProxy { url: String, message: String },

    /// Any other HTTP client failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

impl TransportError {
    /// Creates a new connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Creates a new timeout error.
    pub fn timeout(elapsed_ms: u64) -> Self {
        Self::Timeout { elapsed_ms }
    }

    /// Creates a new invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Creates a new invalid proxy error.
    pub fn invalid_proxy(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidProxy {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns true if the server could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_) | Self::Timeout { .. })
    }
}
