//! Orchestrator states and the legal transitions between them

use serde::{Deserialize, Serialize};

/// Continuation Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrchestratorState {
    /// About to issue a service call
    Requesting,
    /// Consuming the call's events
    Streaming,
    /// Deciding COMPLETE / TRUNCATED / INVALID
    Classifying,
    /// Preparing a continuation call
    Continuing,
    /// Extracting imports and checking the allow-list
    Validating,
    /// Preparing a rewrite call
    Rewriting,
    /// Finished with a compliant artifact
    Done,
    /// Finished with a failure
    Failed,
}

impl OrchestratorState {
    /// Whether no transition leaves this state
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, OrchestratorState::Done | OrchestratorState::Failed)
    }
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrchestratorState::Requesting => "REQUESTING",
            OrchestratorState::Streaming => "STREAMING",
            OrchestratorState::Classifying => "CLASSIFYING",
            OrchestratorState::Continuing => "CONTINUING",
            OrchestratorState::Validating => "VALIDATING",
            OrchestratorState::Rewriting => "REWRITING",
            OrchestratorState::Done => "DONE",
            OrchestratorState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Attempted transition not in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition {from} -> {to}")]
pub struct IllegalTransition {
    /// Current state
    pub from: OrchestratorState,
    /// Requested state
    pub to: OrchestratorState,
}

/// States reachable from `from` in one step
///
/// Every non-terminal state may fail (transport, cancellation).
#[must_use]
pub fn allowed_transitions(from: OrchestratorState) -> &'static [OrchestratorState] {
    use OrchestratorState::*;
    match from {
        Requesting => &[Streaming, Failed],
        Streaming => &[Classifying, Failed],
        Classifying => &[Continuing, Rewriting, Validating, Failed],
        Continuing | Rewriting => &[Requesting, Failed],
        Validating => &[Done, Rewriting, Failed],
        Done | Failed => &[],
    }
}

/// Check a transition against [`allowed_transitions`]
///
/// # Errors
/// Returns [`IllegalTransition`] if `to` is not reachable from `from`.
pub fn validate_transition(
    from: OrchestratorState,
    to: OrchestratorState,
) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}
