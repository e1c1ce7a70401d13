//! Upstream client error types.

use std::time::Duration;

use thiserror::Error;

/// Result type for upstream client calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised while talking to an upstream HTTP service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The upstream did not answer within the configured timeout.
    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),

    /// The upstream could not be reached at all.
    #[error("cannot reach upstream: {0}")]
    Connect(String),

    /// The upstream rejected the credential.
    #[error("upstream rejected the credential (HTTP {0}); check the API token")]
    Unauthorized(u16),

    /// The upstream answered with a non-success status.
    #[error("upstream returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The upstream answered with a body we could not decode.
    #[error("unexpected response body: {0}")]
    InvalidResponse(String),

    /// Any other request failure.
    #[error("request failed: {0}")]
    Transport(String),

    /// The HTTP client itself could not be built.
    #[error("cannot build HTTP client: {0}")]
    Build(String),
}

impl ClientError {
    /// Classify a reqwest failure.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }

    /// Create a status error.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Whether the upstream reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}
