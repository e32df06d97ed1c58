//! Error types for the completion client.

use std::time::Duration;

/// Classified failure of a single completion exchange.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompletionError {
    /// Connection, DNS, TLS or timeout failure before a status was received.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Service signalled throttling (HTTP 429).
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Success status, but the expected text field was missing or unreadable.
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },

    /// Client could not be constructed from the given configuration.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl CompletionError {
    /// Whether the service asked us to slow down.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Config { .. })
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse {
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                message: err.to_string(),
            }
        }
    }
}

/// Result type for completion operations.
pub type Result<T> = std::result::Result<T, CompletionError>;
