//! UIGEN Syntax
//!
//! Structural analysis of generated TSX components.
//!
//! # Overview
//!
//! - **fence**: pulls component code out of a chat-style answer
//! - **SyntaxTreeAnalyzer**: parses complete code and lists every module
//!   reference (static, namespace, type-only, re-export, `import()`,
//!   `require()`, `import x = require()`)
//! - **CompletenessClassifier**: tells finished, cut-off and malformed code
//!   apart, even though cut-off code never parses
//!
//! # Example
//!
//! ```rust
//! use uigen_syntax::{CompletenessClassifier, CompletenessVerdict, SyntaxTreeAnalyzer, TerminalSignal};
//!
//! let classifier = CompletenessClassifier::new();
//! let (code, verdict) = classifier
//!     .classify_text("```tsx\nimport React from 'react';\n", &TerminalSignal::Stop)
//!     .unwrap();
//! assert_eq!(verdict, CompletenessVerdict::Complete);
//!
//! let imports = SyntaxTreeAnalyzer::new().analyze(&code.code).unwrap();
//! assert_eq!(imports[0].specifier, "react");
//! ```

#![warn(missing_docs)]

pub mod analyzer;
pub mod classifier;
pub mod error;
pub mod fence;
pub mod imports;
pub mod parser;
pub mod scan;

// Re-exports
pub use analyzer::SyntaxTreeAnalyzer;
pub use classifier::{
    CompletenessClassifier, CompletenessProbe, CompletenessVerdict, Diagnostic, ProbeContext,
    TerminalSignal, VerdictReason,
};
pub use error::ParseError;
pub use fence::{extract_code, leading_fence_len, ExtractedCode, FenceState};
pub use imports::{ImportExtractor, ImportKind, ImportOrigin, ImportRecord};
pub use parser::{ComponentParser, ErrorSite, ErrorSiteKind, ParsedSource, SourcePosition};
pub use scan::{scan_tail, TailScan};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for syntax analysis
    pub use crate::{
        extract_code, CompletenessClassifier, CompletenessVerdict, ImportRecord, ParseError,
        SyntaxTreeAnalyzer, TerminalSignal,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
