//! Request, attempt and result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uigen_policy::ComplianceReport;
use uigen_stream::{ChatMessage, FinishReason, StreamError, TransportError};
use uigen_syntax::{CompletenessVerdict, ImportRecord};

/// Unique request identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub ulid::Ulid);

impl RequestId {
    /// Generate new ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// One top-level generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Natural-language requirement
    pub requirement: String,
    /// Output ceiling per call, in tokens
    pub max_output_tokens: u32,
    /// Prior turns placed before the generated prompt
    pub history: Vec<ChatMessage>,
}

impl GenerationRequest {
    /// Request with no prior history
    pub fn new(requirement: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            requirement: requirement.into(),
            max_output_tokens,
            history: Vec::new(),
        }
    }

    /// With prior conversation turns
    #[must_use]
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }
}

/// Why a rewrite was requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewriteCause {
    /// Previous attempt was INVALID
    Malformed,
    /// Previous attempt imported these disallowed modules
    PolicyViolation(Vec<String>),
}

/// Role of a service call within its request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptKind {
    /// First call
    Initial,
    /// Resume a truncated artifact
    Continuation,
    /// Start over with corrective instructions
    Rewrite(RewriteCause),
}

/// Diagnostics for one logical service call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based call number within the request
    pub call: u32,
    /// Initial, continuation or rewrite
    pub kind: AttemptKind,
    /// When the call was first issued
    pub started_at: DateTime<Utc>,
    /// Wall time including local retries
    pub elapsed_ms: u64,
    /// Local transport retries spent on this call
    pub transport_retries: u32,
    /// Bytes of content received on the successful try
    pub received_bytes: usize,
    /// Finish reason reported by the service
    pub finish: Option<FinishReason>,
    /// Recoverable stream failure, if the stream broke off
    pub stream_error: Option<StreamError>,
    /// Final transport error, if the call never completed
    pub transport_error: Option<TransportError>,
    /// Completeness verdict of the artifact after this call
    pub verdict: Option<CompletenessVerdict>,
    /// Disallowed modules found after this call
    pub violations: Vec<String>,
}

impl AttemptRecord {
    pub(crate) fn started(call: u32, kind: AttemptKind) -> Self {
        Self {
            call,
            kind,
            started_at: Utc::now(),
            elapsed_ms: 0,
            transport_retries: 0,
            received_bytes: 0,
            finish: None,
            stream_error: None,
            transport_error: None,
            verdict: None,
            violations: Vec::new(),
        }
    }
}

/// Successful result of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalArtifact {
    /// Request that produced it
    pub request_id: RequestId,
    /// Component source (code only, no surrounding prose)
    pub source: String,
    /// Compliance report; always compliant here
    pub report: ComplianceReport,
    /// Every module reference in `source`
    pub imports: Vec<ImportRecord>,
    /// Continuations spent
    pub continuations_used: u32,
    /// Rewrites spent
    pub rewrites_used: u32,
    /// Every call made for the request
    pub attempts: Vec<AttemptRecord>,
}
