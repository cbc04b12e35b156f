//! tree-sitter TSX parsing
//!
//! Wraps the TSX grammar from `tree-sitter-typescript`. TSX is a superset of
//! what generated components use (JSX, TypeScript annotations, plain JS), so
//! one grammar serves every fence tag we accept.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// 1-based line/column position in source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    /// Line (1-based)
    pub line: usize,
    /// Column in bytes (1-based)
    pub column: usize,
}

impl SourcePosition {
    #[inline]
    #[must_use]
    pub(crate) fn from_point(point: tree_sitter::Point) -> Self {
        Self {
            line: point.row + 1,
            column: point.column + 1,
        }
    }
}

impl std::fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Kind of error node produced by tree-sitter's error recovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorSiteKind {
    /// Tokens the parser could not fit into any rule (`ERROR` node)
    Unexpected,
    /// Zero-width node inserted for a missing token; holds the expected kind
    Missing(String),
}

/// One error node in a parsed tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSite {
    /// Error or missing token
    pub kind: ErrorSiteKind,
    /// Byte range covered by the node
    pub bytes: Range<usize>,
    /// Start of the node
    pub position: SourcePosition,
}

impl ErrorSite {
    /// Short human-readable description
    #[must_use]
    pub fn describe(&self, source: &str) -> String {
        match &self.kind {
            ErrorSiteKind::Missing(expected) => format!("missing `{expected}`"),
            ErrorSiteKind::Unexpected => {
                let text = source.get(self.bytes.clone()).unwrap_or("");
                let snippet: String = text.chars().take(24).collect();
                if snippet.trim().is_empty() {
                    "unexpected input".to_string()
                } else {
                    format!("unexpected `{}`", snippet.trim())
                }
            }
        }
    }
}

/// TSX parser
///
/// Holds only the grammar; a fresh `tree_sitter::Parser` is created per parse
/// so the type is `Send + Sync` and can be shared between requests.
#[derive(Clone)]
pub struct ComponentParser {
    language: tree_sitter::Language,
}

impl std::fmt::Debug for ComponentParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentParser")
            .field("grammar", &"tsx")
            .finish()
    }
}

impl Default for ComponentParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentParser {
    /// Create parser for the TSX grammar
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            language: tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    /// Parse source text
    ///
    /// Succeeds for any input, including syntactically broken text: error
    /// recovery yields a tree with `ERROR`/`MISSING` nodes. Inspect
    /// [`ParsedSource::has_errors`].
    ///
    /// # Errors
    /// Returns error if the grammar cannot be loaded or tree-sitter gives up.
    pub fn parse(&self, source: &str) -> Result<ParsedSource, ParseError> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ParseError::ParserInit(e.to_string()))?;

        let tree = parser.parse(source, None).ok_or(ParseError::ParseFailed)?;

        Ok(ParsedSource {
            source: source.to_string(),
            tree,
        })
    }
}

/// Source text together with its syntax tree
#[derive(Debug, Clone)]
pub struct ParsedSource {
    source: String,
    tree: tree_sitter::Tree,
}

impl ParsedSource {
    /// Source text
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Root node of the tree
    #[inline]
    #[must_use]
    pub fn root(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    /// Whether error recovery was needed anywhere
    #[inline]
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// All `ERROR` and `MISSING` nodes, in document order
    #[must_use]
    pub fn error_sites(&self) -> Vec<ErrorSite> {
        let mut sites = Vec::new();
        collect_error_sites(self.tree.root_node(), &mut sites);
        sites.sort_by_key(|s| (s.bytes.start, s.bytes.end));
        sites
    }

    /// First error site, if any
    #[must_use]
    pub fn first_error(&self) -> Option<ErrorSite> {
        self.error_sites().into_iter().next()
    }

    /// Convert the first error into a [`ParseError::SyntaxError`]
    #[must_use]
    pub fn to_syntax_error(&self) -> Option<ParseError> {
        self.first_error().map(|site| {
            ParseError::syntax_error(
                site.position.line,
                site.position.column,
                site.describe(&self.source),
            )
        })
    }
}

fn collect_error_sites(node: tree_sitter::Node<'_>, sites: &mut Vec<ErrorSite>) {
    if node.is_missing() {
        sites.push(ErrorSite {
            kind: ErrorSiteKind::Missing(node.kind().to_string()),
            bytes: node.byte_range(),
            position: SourcePosition::from_point(node.start_position()),
        });
        return;
    }
    if node.is_error() {
        sites.push(ErrorSite {
            kind: ErrorSiteKind::Unexpected,
            bytes: node.byte_range(),
            position: SourcePosition::from_point(node.start_position()),
        });
    }
    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_sites(child, sites);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_component() {
        let parser = ComponentParser::new();
        let parsed = parser
            .parse("const Button = ({ label }) => <button>{label}</button>;\n")
            .unwrap();
        assert!(!parsed.has_errors());
        assert!(parsed.error_sites().is_empty());
        assert!(parsed.to_syntax_error().is_none());
    }

    #[test]
    fn broken_source_still_yields_tree_with_errors() {
        let parser = ComponentParser::new();
        let parsed = parser.parse("function a() { return 1; }}\n").unwrap();
        assert!(parsed.has_errors());

        let first = parsed.first_error().unwrap();
        assert_eq!(first.position.line, 1);
        assert!(matches!(
            parsed.to_syntax_error(),
            Some(ParseError::SyntaxError { line: 1, .. })
        ));
    }

    #[test]
    fn position_display() {
        let pos = SourcePosition { line: 4, column: 2 };
        assert_eq!(pos.to_string(), "4:2");
    }
}
