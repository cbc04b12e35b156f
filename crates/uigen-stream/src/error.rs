//! Transport errors

use serde::{Deserialize, Serialize};

/// Failure to open or reach the generation service
///
/// Mid-stream failures are not transport errors; they surface as
/// [`StreamError`](crate::StreamError) events so decoded content is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TransportError {
    /// Request failed
    #[error("http error: {0}")]
    Http(String),

    /// Service answered with a non-success status
    #[error("service returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// Call did not finish in time
    #[error("call timed out")]
    Timeout,

    /// Could not connect
    #[error("connection failed: {0}")]
    Connect(String),

    /// Client could not be configured
    #[error("invalid service configuration: {0}")]
    InvalidConfig(String),
}

impl TransportError {
    /// Whether re-issuing the same call may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Http(_) | TransportError::Timeout | TransportError::Connect(_) => true,
            TransportError::Status { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            TransportError::InvalidConfig(_) => false,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidConfig(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}
