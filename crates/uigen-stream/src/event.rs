//! Stream events

use serde::{Deserialize, Serialize};

/// Why the service stopped producing output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinishReason {
    /// Natural end of the answer
    Stop,
    /// Output length ceiling reached
    Length,
    /// Answer withheld by a content filter
    ContentFilter,
    /// Any other reason, as reported
    Other(String),
}

impl FinishReason {
    /// Map the wire value of `finish_reason`
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "stop" => FinishReason::Stop,
            "length" | "max_tokens" => FinishReason::Length,
            "content_filter" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        }
    }

    /// Whether the length ceiling was hit
    #[inline]
    #[must_use]
    pub fn is_length_ceiling(&self) -> bool {
        matches!(self, FinishReason::Length)
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinishReason::Stop => f.write_str("stop"),
            FinishReason::Length => f.write_str("length"),
            FinishReason::ContentFilter => f.write_str("content_filter"),
            FinishReason::Other(other) => f.write_str(other),
        }
    }
}

/// Recoverable stream failure
///
/// The caller treats it as the stream ending without a finish reason;
/// deltas decoded before it remain valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum StreamError {
    /// Event payload was not valid chunk JSON
    #[error("malformed event payload: {message}")]
    MalformedPayload {
        /// Raw payload text
        payload: String,
        /// Decoder message
        message: String,
    },

    /// Line was not valid UTF-8
    #[error("event line is not valid utf-8")]
    InvalidUtf8,

    /// Service sent an error object instead of a chunk
    #[error("service reported error: {0}")]
    Service(String),

    /// Connection failed while reading the body
    #[error("stream interrupted: {0}")]
    Interrupted(String),
}

/// One decoded event, in arrival order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// Content fragment
    Delta(String),
    /// Terminal signal
    FinishReason(FinishReason),
    /// Recoverable failure; nothing follows it
    StreamError(StreamError),
}
