//! Syntax Tree Analyzer

use crate::error::ParseError;
use crate::imports::{default_extractors, extract_imports, ImportExtractor, ImportRecord};
use crate::parser::{ComponentParser, ParsedSource};
use std::sync::Arc;

/// Parses complete component source and lists its module references
#[derive(Clone)]
pub struct SyntaxTreeAnalyzer {
    parser: ComponentParser,
    extractors: Arc<[Box<dyn ImportExtractor>]>,
}

impl std::fmt::Debug for SyntaxTreeAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.extractors.iter().map(|e| e.name()).collect();
        f.debug_struct("SyntaxTreeAnalyzer")
            .field("parser", &self.parser)
            .field("extractors", &names)
            .finish()
    }
}

impl Default for SyntaxTreeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxTreeAnalyzer {
    /// Analyzer with the default extractor pipeline
    #[must_use]
    pub fn new() -> Self {
        Self::with_extractors(default_extractors())
    }

    /// Analyzer with a custom extractor pipeline
    #[must_use]
    pub fn with_extractors(extractors: Vec<Box<dyn ImportExtractor>>) -> Self {
        Self {
            parser: ComponentParser::new(),
            extractors: extractors.into(),
        }
    }

    /// Parser used by this analyzer
    #[inline]
    #[must_use]
    pub fn parser(&self) -> &ComponentParser {
        &self.parser
    }

    /// Extract module references from complete source, ordered by position
    ///
    /// # Errors
    /// Returns [`ParseError::EmptySource`] for blank input and
    /// [`ParseError::SyntaxError`] if the source does not parse cleanly.
    pub fn analyze(&self, code: &str) -> Result<Vec<ImportRecord>, ParseError> {
        if code.trim().is_empty() {
            return Err(ParseError::EmptySource);
        }
        let parsed = self.parser.parse(code)?;
        self.analyze_parsed(&parsed)
    }

    /// Same as [`analyze`](Self::analyze) for an already parsed tree
    ///
    /// # Errors
    /// Returns [`ParseError::SyntaxError`] if the tree contains errors.
    pub fn analyze_parsed(&self, parsed: &ParsedSource) -> Result<Vec<ImportRecord>, ParseError> {
        if let Some(err) = parsed.to_syntax_error() {
            return Err(err);
        }
        let records = extract_imports(parsed, &self.extractors);
        tracing::debug!(imports = records.len(), "imports extracted");
        Ok(records)
    }
}
