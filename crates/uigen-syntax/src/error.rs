//! Error types for syntax analysis

/// Parse error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The TSX grammar could not be loaded into the parser
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    /// tree-sitter returned no tree
    #[error("parse failed")]
    ParseFailed,

    /// Source contains a syntax error
    #[error("syntax error at {line}:{column}: {message}")]
    SyntaxError {
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
        /// What went wrong
        message: String,
    },

    /// Nothing to parse
    #[error("empty source")]
    EmptySource,
}

impl ParseError {
    /// Create a syntax error at a 1-based position
    pub fn syntax_error(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::SyntaxError {
            line,
            column,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_display() {
        let err = ParseError::syntax_error(3, 7, "unexpected `}`");
        assert_eq!(err.to_string(), "syntax error at 3:7: unexpected `}`");
    }
}
