//! Lexical tail scan
//!
//! A single forward pass over the code tracking bracket nesting and
//! string/template/comment state. It does not understand JSX text, so its
//! output is only ever used to *propose* a repair that the real parser then
//! confirms; it never decides a verdict on its own.

use smallvec::SmallVec;

/// Bracket-like construct left open at end of input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opener {
    /// `(`
    Paren,
    /// `[`
    Bracket,
    /// `{`
    Brace,
    /// `${` inside a template literal
    TemplateExpr,
    /// Template literal body
    Template,
}

impl Opener {
    #[inline]
    fn closer(self) -> char {
        match self {
            Opener::Paren => ')',
            Opener::Bracket => ']',
            Opener::Brace | Opener::TemplateExpr => '}',
            Opener::Template => '`',
        }
    }
}

/// Literal or comment still open at end of input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unterminated {
    /// Single- or double-quoted string; holds the quote character
    String(char),
    /// Template literal
    Template,
    /// `/* ...`
    BlockComment,
    /// `// ...` without a trailing newline
    LineComment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    Str(char),
    Template,
    LineComment,
    BlockComment,
}

/// Result of a [`scan_tail`] pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TailScan {
    /// Openers still unclosed at end of input, outermost first
    pub unclosed: SmallVec<[Opener; 16]>,
    /// Literal or comment open at end of input
    pub unterminated: Option<Unterminated>,
    /// Closers that did not match the innermost opener
    pub mismatched_closers: usize,
}

impl TailScan {
    /// Number of unclosed brackets (template bodies excluded)
    #[must_use]
    pub fn open_brackets(&self) -> usize {
        self.unclosed
            .iter()
            .filter(|o| !matches!(o, Opener::Template))
            .count()
    }

    /// Whether a literal or block comment is still open
    #[inline]
    #[must_use]
    pub fn has_unterminated_literal(&self) -> bool {
        matches!(
            self.unterminated,
            Some(Unterminated::String(_) | Unterminated::Template | Unterminated::BlockComment)
        )
    }

    /// Text that would close everything left open, innermost first
    #[must_use]
    pub fn closing_suffix(&self) -> String {
        let mut suffix = String::new();
        match self.unterminated {
            Some(Unterminated::String(quote)) => suffix.push(quote),
            Some(Unterminated::BlockComment) => suffix.push_str("*/"),
            Some(Unterminated::LineComment) => suffix.push('\n'),
            // the template body sits on the opener stack
            Some(Unterminated::Template) | None => {}
        }
        if !self.unclosed.is_empty() && !suffix.ends_with('\n') {
            suffix.push('\n');
        }
        suffix.extend(self.unclosed.iter().rev().map(|o| o.closer()));
        suffix
    }
}

/// Scan `code` for bracket and literal state at end of input
#[must_use]
pub fn scan_tail(code: &str) -> TailScan {
    let mut scan = TailScan::default();
    let mut mode = Mode::Code;
    let mut chars = code.chars().peekable();

    while let Some(c) = chars.next() {
        match mode {
            Mode::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    mode = Mode::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    mode = Mode::BlockComment;
                }
                '\'' | '"' => mode = Mode::Str(c),
                '`' => {
                    scan.unclosed.push(Opener::Template);
                    mode = Mode::Template;
                }
                '(' => scan.unclosed.push(Opener::Paren),
                '[' => scan.unclosed.push(Opener::Bracket),
                '{' => scan.unclosed.push(Opener::Brace),
                ')' | ']' | '}' => match (scan.unclosed.last().copied(), c) {
                    (Some(Opener::Paren), ')')
                    | (Some(Opener::Bracket), ']')
                    | (Some(Opener::Brace), '}') => {
                        scan.unclosed.pop();
                    }
                    (Some(Opener::TemplateExpr), '}') => {
                        scan.unclosed.pop();
                        mode = Mode::Template;
                    }
                    _ => scan.mismatched_closers += 1,
                },
                _ => {}
            },
            Mode::Str(quote) => match c {
                '\\' => {
                    chars.next();
                }
                // strings cannot span lines; this also resets stray
                // apostrophes in JSX text at the next line
                '\n' => mode = Mode::Code,
                c if c == quote => mode = Mode::Code,
                _ => {}
            },
            Mode::Template => match c {
                '\\' => {
                    chars.next();
                }
                '`' => {
                    scan.unclosed.pop();
                    mode = Mode::Code;
                }
                '$' if chars.peek() == Some(&'{') => {
                    chars.next();
                    scan.unclosed.push(Opener::TemplateExpr);
                    mode = Mode::Code;
                }
                _ => {}
            },
            Mode::LineComment => {
                if c == '\n' {
                    mode = Mode::Code;
                }
            }
            Mode::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    mode = Mode::Code;
                }
            }
        }
    }

    scan.unterminated = match mode {
        Mode::Code => None,
        Mode::Str(quote) => Some(Unterminated::String(quote)),
        Mode::Template => Some(Unterminated::Template),
        Mode::LineComment => Some(Unterminated::LineComment),
        Mode::BlockComment => Some(Unterminated::BlockComment),
    };
    scan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_code_has_nothing_open() {
        let scan = scan_tail("const f = (a) => { return [a, (a + 1)]; };");
        assert!(scan.unclosed.is_empty());
        assert_eq!(scan.unterminated, None);
        assert_eq!(scan.closing_suffix(), "");
    }

    #[test]
    fn unclosed_brackets_close_in_reverse() {
        let scan = scan_tail("const App = () => {\n  const xs = [1, 2].map((n) => {");
        assert_eq!(scan.open_brackets(), 3);
        assert_eq!(scan.closing_suffix(), "\n})}");
    }

    #[test]
    fn unterminated_string_is_closed_first() {
        let scan = scan_tail("call(\"abc");
        assert_eq!(scan.unterminated, Some(Unterminated::String('"')));
        assert_eq!(scan.closing_suffix(), "\"\n)");
    }

    #[test]
    fn brackets_inside_strings_and_comments_are_ignored() {
        let scan = scan_tail("const s = '({['; // {{{\n/* ((( */ const t = \"]\";");
        assert!(scan.unclosed.is_empty());
        assert_eq!(scan.mismatched_closers, 0);
    }

    #[test]
    fn template_expression_nesting() {
        let scan = scan_tail("const s = `a ${fn({ b: 1 })} c`;");
        assert!(scan.unclosed.is_empty());
        assert_eq!(scan.unterminated, None);

        let open = scan_tail("const s = `a ${value");
        assert_eq!(open.closing_suffix(), "\n}`");
    }

    #[test]
    fn stray_closer_is_counted() {
        let scan = scan_tail("function a() { return 1; }}");
        assert_eq!(scan.mismatched_closers, 1);
        assert!(scan.unclosed.is_empty());
    }

    #[test]
    fn line_comment_at_end_gets_newline() {
        let scan = scan_tail("f(() => { // trailing");
        assert_eq!(scan.closing_suffix(), "\n})");
    }
}
