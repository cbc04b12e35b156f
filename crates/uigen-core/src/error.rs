//! Error types for the orchestrator
//!
//! Only [`FailureReason`] (wrapped in [`GenerationFailure`]) leaves the
//! orchestrator; truncation, malformation and policy violations are handled
//! inside the state machine.

use crate::budget::AttemptBudget;
use crate::types::{AttemptRecord, RequestId};
use std::path::PathBuf;
use uigen_policy::PolicyError;
use uigen_stream::TransportError;
use uigen_syntax::ParseError;

/// Why a request ended without an artifact
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    /// Still truncated after the last allowed continuation
    #[error("continuation budget exhausted after {used} continuations")]
    ExhaustedContinuations {
        /// Continuations issued
        used: u32,
    },

    /// Still malformed or non-compliant after the last allowed rewrite
    #[error("rewrite budget exhausted after {used} rewrites")]
    ExhaustedRewrites {
        /// Rewrites issued
        used: u32,
    },

    /// Service unreachable after local retries
    #[error("transport failure: {0}")]
    TransportFailure(#[source] TransportError),

    /// COMPLETE text failed to parse for import analysis
    #[error("internal parse inconsistency: {0}")]
    InternalParseInconsistency(#[source] ParseError),

    /// Request cancelled by the caller
    #[error("request cancelled")]
    Cancelled,
}

/// Terminal failure of one request, with everything needed to diagnose it
#[derive(Debug, Clone, thiserror::Error)]
#[error("generation {request_id} failed: {reason}")]
pub struct GenerationFailure {
    /// Request that failed
    pub request_id: RequestId,
    /// Typed reason
    #[source]
    pub reason: FailureReason,
    /// Best partial code, for inspection only; never a successful result
    pub partial: Option<String>,
    /// Every call made for the request
    pub attempts: Vec<AttemptRecord>,
    /// Budget at the time of failure
    pub budget: AttemptBudget,
}

impl GenerationFailure {
    /// Number of service calls made (transport retries excluded)
    #[inline]
    #[must_use]
    pub fn calls(&self) -> usize {
        self.attempts.len()
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// TOML did not match the schema
    #[error("invalid config toml: {0}")]
    Toml(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid config value: {0}")]
    Invalid(String),

    /// Allow-list rejected
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// HTTP client could not be built
    #[error(transparent)]
    Service(#[from] TransportError),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_display() {
        assert_eq!(
            FailureReason::ExhaustedContinuations { used: 2 }.to_string(),
            "continuation budget exhausted after 2 continuations"
        );
        assert_eq!(
            FailureReason::TransportFailure(TransportError::Timeout).to_string(),
            "transport failure: call timed out"
        );
    }
}
