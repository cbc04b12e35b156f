//! Completeness Classifier
//!
//! Decides whether accumulated component text is finished, cut off
//! (resumable by asking the service to continue) or malformed (only a
//! rewrite helps). The decision is made by an ordered pipeline of
//! [`CompletenessProbe`]s; each returns a verdict or declines, and text no
//! probe accepts falls through to INVALID.
//!
//! Tail vs interior failures are told apart by repair: the lexical
//! [`scan_tail`] proposes the closers that would finish the text, and if
//! appending them makes the parser happy the failure was truncation. When
//! repair is not enough (cut inside a JSX tag, say) the error sites
//! themselves must sit at the end of the text.

use crate::error::ParseError;
use crate::fence::{extract_code, ExtractedCode};
use crate::parser::{ComponentParser, ParsedSource, SourcePosition};
use crate::scan::{scan_tail, TailScan};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How the generation call ended, as far as the classifier cares
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminalSignal {
    /// Service hit its output length ceiling
    LengthCeiling,
    /// Natural stop
    Stop,
    /// Some other reason reported by the service
    Other(String),
    /// Stream ended without a finish reason
    Absent,
    /// Stream broke off with an error after some content
    Interrupted,
}

/// Why a verdict was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerdictReason {
    /// Service reported the length ceiling
    LengthCeiling,
    /// Stream broke off; more content was on its way
    Interrupted,
    /// No code at all
    EmptyArtifact,
    /// Appending the missing closers yields a clean parse
    ClosedByRepair,
    /// Every syntax error sits at the end of the text
    TailLocalError,
    /// Syntax error not explained by truncation
    InteriorError,
}

/// Details attached to a TRUNCATED or INVALID verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Probe outcome
    pub reason: VerdictReason,
    /// First syntax error, if the text did not parse
    pub location: Option<SourcePosition>,
    /// Short description of the first syntax error
    pub message: Option<String>,
    /// Brackets still open at end of text
    pub open_brackets: usize,
    /// A string, template or block comment is still open
    pub unterminated_literal: bool,
    /// The code fence was opened but never closed
    pub unclosed_fence: bool,
    /// How the call ended
    pub signal: TerminalSignal,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.reason)?;
        if let Some(location) = self.location {
            write!(f, " at {location}")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if self.open_brackets > 0 {
            write!(f, " ({} open brackets)", self.open_brackets)?;
        }
        Ok(())
    }
}

/// Classifier output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletenessVerdict {
    /// Parses cleanly
    Complete,
    /// Cut off; continue generating
    Truncated(Diagnostic),
    /// Malformed; rewrite required
    Invalid(Diagnostic),
}

impl CompletenessVerdict {
    /// Verdict name for logs
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            CompletenessVerdict::Complete => "COMPLETE",
            CompletenessVerdict::Truncated(_) => "TRUNCATED",
            CompletenessVerdict::Invalid(_) => "INVALID",
        }
    }

    /// Attached diagnostic, if any
    #[must_use]
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            CompletenessVerdict::Complete => None,
            CompletenessVerdict::Truncated(d) | CompletenessVerdict::Invalid(d) => Some(d),
        }
    }
}

/// Everything a probe may look at
#[derive(Debug)]
pub struct ProbeContext<'a> {
    /// Code extracted from the artifact text
    pub extracted: &'a ExtractedCode,
    /// How the last call ended
    pub signal: &'a TerminalSignal,
    /// Parse of the extracted code
    pub parsed: &'a ParsedSource,
    /// Lexical scan of the extracted code
    pub scan: &'a TailScan,
    /// Parser, for probes that re-parse
    pub parser: &'a ComponentParser,
}

impl ProbeContext<'_> {
    /// Build a diagnostic from this context
    #[must_use]
    pub fn diagnostic(&self, reason: VerdictReason) -> Diagnostic {
        let first = self.parsed.first_error();
        Diagnostic {
            reason,
            location: first.as_ref().map(|site| site.position),
            message: first.map(|site| site.describe(self.parsed.source())),
            open_brackets: self.scan.open_brackets(),
            unterminated_literal: self.scan.has_unterminated_literal(),
            unclosed_fence: self.extracted.fence_unclosed(),
            signal: self.signal.clone(),
        }
    }
}

/// One layer of the classification pipeline
pub trait CompletenessProbe: Send + Sync {
    /// Name used in trace output
    fn name(&self) -> &'static str;

    /// Return a verdict, or `None` to defer to the next probe
    fn probe(&self, ctx: &ProbeContext<'_>) -> Option<CompletenessVerdict>;
}

/// Length ceiling or a broken stream means truncated, whatever the text
/// looks like
#[derive(Debug, Clone, Copy, Default)]
pub struct FinishReasonProbe;

impl CompletenessProbe for FinishReasonProbe {
    fn name(&self) -> &'static str {
        "finish-reason"
    }

    fn probe(&self, ctx: &ProbeContext<'_>) -> Option<CompletenessVerdict> {
        let reason = match ctx.signal {
            TerminalSignal::LengthCeiling => VerdictReason::LengthCeiling,
            TerminalSignal::Interrupted => VerdictReason::Interrupted,
            _ => return None,
        };
        Some(CompletenessVerdict::Truncated(ctx.diagnostic(reason)))
    }
}

/// Nothing to continue from
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyProbe;

impl CompletenessProbe for EmptyProbe {
    fn name(&self) -> &'static str {
        "empty"
    }

    fn probe(&self, ctx: &ProbeContext<'_>) -> Option<CompletenessVerdict> {
        ctx.extracted
            .code
            .trim()
            .is_empty()
            .then(|| CompletenessVerdict::Invalid(ctx.diagnostic(VerdictReason::EmptyArtifact)))
    }
}

/// No error nodes anywhere
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanParseProbe;

impl CompletenessProbe for CleanParseProbe {
    fn name(&self) -> &'static str {
        "clean-parse"
    }

    fn probe(&self, ctx: &ProbeContext<'_>) -> Option<CompletenessVerdict> {
        (!ctx.parsed.has_errors()).then_some(CompletenessVerdict::Complete)
    }
}

/// Append the scan's closing suffix and re-parse
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosingRepairProbe;

impl CompletenessProbe for ClosingRepairProbe {
    fn name(&self) -> &'static str {
        "closing-repair"
    }

    fn probe(&self, ctx: &ProbeContext<'_>) -> Option<CompletenessVerdict> {
        let suffix = ctx.scan.closing_suffix();
        if suffix.is_empty() {
            return None;
        }
        let mut repaired = ctx.extracted.code.clone();
        repaired.push_str(&suffix);

        let reparsed = ctx.parser.parse(&repaired).ok()?;
        tracing::trace!(suffix = %suffix.escape_debug(), clean = !reparsed.has_errors(), "closing repair");
        (!reparsed.has_errors())
            .then(|| CompletenessVerdict::Truncated(ctx.diagnostic(VerdictReason::ClosedByRepair)))
    }
}

/// Every error site touches the end of the text or the last line
///
/// After a natural stop the last line is only taken for a cut-off when
/// something is still open and the lines before it do not already form a
/// complete program; otherwise it is trailing junk.
#[derive(Debug, Clone, Copy, Default)]
pub struct TailLocalityProbe;

impl CompletenessProbe for TailLocalityProbe {
    fn name(&self) -> &'static str {
        "tail-locality"
    }

    fn probe(&self, ctx: &ProbeContext<'_>) -> Option<CompletenessVerdict> {
        // a closer with no opener is never produced by cutting text short
        if ctx.scan.mismatched_closers > 0 {
            return None;
        }
        let sites = ctx.parsed.error_sites();
        if sites.is_empty() {
            return None;
        }

        let code = ctx.extracted.code.as_str();
        let end = code.trim_end().len();
        let last_line_start = code[..end].rfind('\n').map_or(0, |i| i + 1);

        let tail_local = sites
            .iter()
            .all(|site| site.bytes.end >= end || site.bytes.start >= last_line_start);
        if !tail_local {
            return None;
        }
        if *ctx.signal == TerminalSignal::Stop && trailing_junk(ctx, &code[..last_line_start]) {
            tracing::trace!("error line follows a finished program");
            return None;
        }
        Some(CompletenessVerdict::Truncated(
            ctx.diagnostic(VerdictReason::TailLocalError),
        ))
    }
}

/// Whether the failing last line trails text that was already finished
fn trailing_junk(ctx: &ProbeContext<'_>, head: &str) -> bool {
    let nothing_open = ctx.scan.open_brackets() == 0
        && !ctx.scan.has_unterminated_literal()
        && !ctx.extracted.fence_unclosed();
    if nothing_open {
        return true;
    }
    !head.trim().is_empty()
        && ctx
            .parser
            .parse(head)
            .is_ok_and(|parsed| !parsed.has_errors())
}

/// Default probe pipeline, in evaluation order
#[must_use]
pub fn default_probes() -> Vec<Box<dyn CompletenessProbe>> {
    vec![
        Box::new(FinishReasonProbe),
        Box::new(EmptyProbe),
        Box::new(CleanParseProbe),
        Box::new(ClosingRepairProbe),
        Box::new(TailLocalityProbe),
    ]
}

/// Completeness Classifier
#[derive(Clone)]
pub struct CompletenessClassifier {
    parser: ComponentParser,
    probes: Arc<[Box<dyn CompletenessProbe>]>,
}

impl std::fmt::Debug for CompletenessClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.probes.iter().map(|p| p.name()).collect();
        f.debug_struct("CompletenessClassifier")
            .field("probes", &names)
            .finish()
    }
}

impl Default for CompletenessClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletenessClassifier {
    /// Classifier with the default probe pipeline
    #[must_use]
    pub fn new() -> Self {
        Self::with_probes(default_probes())
    }

    /// Classifier with a custom probe pipeline
    #[must_use]
    pub fn with_probes(probes: Vec<Box<dyn CompletenessProbe>>) -> Self {
        Self {
            parser: ComponentParser::new(),
            probes: probes.into(),
        }
    }

    /// Classify already extracted code
    ///
    /// # Errors
    /// Returns error only if the parser itself fails; broken source is a
    /// verdict, not an error.
    pub fn classify(
        &self,
        extracted: &ExtractedCode,
        signal: &TerminalSignal,
    ) -> Result<CompletenessVerdict, ParseError> {
        let parsed = self.parser.parse(&extracted.code)?;
        let scan = scan_tail(&extracted.code);
        let ctx = ProbeContext {
            extracted,
            signal,
            parsed: &parsed,
            scan: &scan,
            parser: &self.parser,
        };

        for probe in self.probes.iter() {
            if let Some(verdict) = probe.probe(&ctx) {
                tracing::debug!(probe = probe.name(), verdict = verdict.label(), "classified");
                return Ok(verdict);
            }
        }

        tracing::debug!(probe = "fallback", verdict = "INVALID", "classified");
        Ok(CompletenessVerdict::Invalid(
            ctx.diagnostic(VerdictReason::InteriorError),
        ))
    }

    /// Extract code from raw artifact text, then classify it
    ///
    /// # Errors
    /// See [`classify`](Self::classify).
    pub fn classify_text(
        &self,
        text: &str,
        signal: &TerminalSignal,
    ) -> Result<(ExtractedCode, CompletenessVerdict), ParseError> {
        let extracted = extract_code(text);
        let verdict = self.classify(&extracted, signal)?;
        Ok((extracted, verdict))
    }
}
