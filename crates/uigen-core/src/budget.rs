//! Per-request attempt budget

use serde::{Deserialize, Serialize};

/// Limits for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Budgets {
    /// Continuation calls allowed after the first call of an attempt
    pub max_continuations: u32,
    /// Rewrites allowed after the initial attempt
    pub max_rewrites: u32,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            max_continuations: 3,
            max_rewrites: 2,
        }
    }
}

impl Budgets {
    /// Create budgets
    #[inline]
    #[must_use]
    pub const fn new(max_continuations: u32, max_rewrites: u32) -> Self {
        Self {
            max_continuations,
            max_rewrites,
        }
    }

    /// Upper bound on service calls for one request
    #[inline]
    #[must_use]
    pub fn max_calls(&self) -> u64 {
        (u64::from(self.max_continuations) + 1) * (u64::from(self.max_rewrites) + 1)
    }
}

/// Counters for one request
///
/// Counters only grow. A request never resets them, not even on rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptBudget {
    limits: Budgets,
    continuations_used: u32,
    rewrites_used: u32,
}

impl AttemptBudget {
    /// Fresh budget
    #[inline]
    #[must_use]
    pub fn new(limits: Budgets) -> Self {
        Self {
            limits,
            continuations_used: 0,
            rewrites_used: 0,
        }
    }

    /// Limits in force
    #[inline]
    #[must_use]
    pub fn limits(&self) -> Budgets {
        self.limits
    }

    /// Continuations spent
    #[inline]
    #[must_use]
    pub fn continuations_used(&self) -> u32 {
        self.continuations_used
    }

    /// Rewrites spent
    #[inline]
    #[must_use]
    pub fn rewrites_used(&self) -> u32 {
        self.rewrites_used
    }

    /// Continuations left
    #[inline]
    #[must_use]
    pub fn continuations_remaining(&self) -> u32 {
        self.limits.max_continuations - self.continuations_used
    }

    /// Rewrites left
    #[inline]
    #[must_use]
    pub fn rewrites_remaining(&self) -> u32 {
        self.limits.max_rewrites - self.rewrites_used
    }

    /// Spend one continuation; `false` if none is left
    pub fn try_continue(&mut self) -> bool {
        if self.continuations_remaining() == 0 {
            return false;
        }
        self.continuations_used += 1;
        true
    }

    /// Spend one rewrite; `false` if none is left
    pub fn try_rewrite(&mut self) -> bool {
        if self.rewrites_remaining() == 0 {
            return false;
        }
        self.rewrites_used += 1;
        true
    }
}
