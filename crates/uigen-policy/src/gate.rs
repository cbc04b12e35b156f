//! Dependency Policy Gate

use crate::allow_list::AllowList;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use uigen_syntax::ImportRecord;

/// Overall compliance outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplianceVerdict {
    /// Every import is allow-listed
    Compliant,
    /// At least one import is not
    Violation,
}

/// Result of checking one artifact's imports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// Outcome
    pub verdict: ComplianceVerdict,
    /// Disallowed imports, in source order
    pub violations: Vec<ImportRecord>,
}

impl ComplianceReport {
    /// Report with no violations
    #[must_use]
    pub fn compliant() -> Self {
        Self {
            verdict: ComplianceVerdict::Compliant,
            violations: Vec::new(),
        }
    }

    /// Whether the artifact passed
    #[inline]
    #[must_use]
    pub fn is_compliant(&self) -> bool {
        self.verdict == ComplianceVerdict::Compliant
    }

    /// Distinct disallowed identifiers, sorted
    #[must_use]
    pub fn disallowed_modules(&self) -> Vec<&str> {
        self.violations
            .iter()
            .map(|r| r.specifier.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Checks import records against an allow-list
#[derive(Debug, Clone)]
pub struct DependencyPolicyGate {
    allow_list: Arc<AllowList>,
}

impl DependencyPolicyGate {
    /// Create gate over `allow_list`
    #[must_use]
    pub fn new(allow_list: AllowList) -> Self {
        Self {
            allow_list: Arc::new(allow_list),
        }
    }

    /// Allow-list in use
    #[inline]
    #[must_use]
    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Evaluate `imports`; an empty violation list means compliant
    #[must_use]
    pub fn evaluate(&self, imports: &[ImportRecord]) -> ComplianceReport {
        let violations: Vec<ImportRecord> = imports
            .iter()
            .filter(|r| !self.allow_list.contains(&r.specifier))
            .cloned()
            .collect();

        if violations.is_empty() {
            tracing::debug!(imports = imports.len(), "imports compliant");
            return ComplianceReport::compliant();
        }

        let report = ComplianceReport {
            verdict: ComplianceVerdict::Violation,
            violations,
        };
        tracing::warn!(
            disallowed = ?report.disallowed_modules(),
            "dependency policy violation"
        );
        report
    }
}

impl Default for DependencyPolicyGate {
    fn default() -> Self {
        Self::new(AllowList::default())
    }
}
