//! UIGEN Policy
//!
//! Dependency allow-list gate for generated components. Every module
//! reference found by the syntax analyzer must match an allow-list entry
//! exactly; anything else is reported as a violation.
//!
//! # Example
//!
//! ```rust
//! use uigen_policy::{AllowList, DependencyPolicyGate};
//! use uigen_syntax::SyntaxTreeAnalyzer;
//!
//! let gate = DependencyPolicyGate::new(AllowList::new(["react"]).unwrap());
//! let imports = SyntaxTreeAnalyzer::new()
//!     .analyze("import React from 'react';\nimport m from 'moment';\n")
//!     .unwrap();
//!
//! let report = gate.evaluate(&imports);
//! assert_eq!(report.disallowed_modules(), ["moment"]);
//! ```

#![warn(missing_docs)]

pub mod allow_list;
pub mod error;
pub mod gate;

// Re-exports
pub use allow_list::{AllowList, DEFAULT_ALLOWED};
pub use error::PolicyError;
pub use gate::{ComplianceReport, ComplianceVerdict, DependencyPolicyGate};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for policy checks
    pub use crate::{AllowList, ComplianceReport, ComplianceVerdict, DependencyPolicyGate};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
