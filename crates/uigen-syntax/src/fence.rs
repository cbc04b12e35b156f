//! Fenced-code extraction
//!
//! Generation services answer in chat prose with the component inside a
//! Markdown code fence. Everything downstream (parsing, classification,
//! import analysis) works on the extracted code only.

use serde::{Deserialize, Serialize};

/// Info-string tags accepted on an opening fence. An empty tag is accepted too.
pub const CODE_FENCE_TAGS: &[&str] = &[
    "tsx",
    "jsx",
    "typescript",
    "ts",
    "javascript",
    "js",
    "react",
];

const FENCE: &str = "```";

/// How the code was delimited in the surrounding text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FenceState {
    /// No opening fence; the whole text was taken as code
    Absent,
    /// Opening and closing fence both present
    Closed,
    /// Opening fence present, closing fence missing (text was cut off)
    Unclosed,
}

/// Code extracted from a generation-service answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCode {
    /// Code body
    pub code: String,
    /// Fence state
    pub fence: FenceState,
}

impl ExtractedCode {
    /// Whether the opening fence was never closed
    #[inline]
    #[must_use]
    pub fn fence_unclosed(&self) -> bool {
        self.fence == FenceState::Unclosed
    }
}

/// Extract the component code from a chat answer
///
/// - first opening fence with a closing fence: the body between them
/// - opening fence without a closing fence: everything after the opening line
/// - no opening fence: the whole text, minus stray fence marker lines
#[must_use]
pub fn extract_code(text: &str) -> ExtractedCode {
    let opening = find_opening_fence(text).filter(|&(open_start, body_start)| {
        // A bare marker closing the text after some code is a stray closer.
        let bare = text[open_start..body_start].trim() == FENCE;
        !(bare
            && text[body_start..].trim().is_empty()
            && !text[..open_start].trim().is_empty())
    });
    let Some((_, body_start)) = opening else {
        let code = text
            .lines()
            .filter(|line| !line.trim_start().starts_with(FENCE))
            .collect::<Vec<_>>()
            .join("\n");
        return ExtractedCode {
            code,
            fence: FenceState::Absent,
        };
    };

    let body = &text[body_start..];
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        if line.trim() == FENCE {
            return ExtractedCode {
                code: body[..offset].to_string(),
                fence: FenceState::Closed,
            };
        }
        offset += line.len();
    }

    ExtractedCode {
        code: body.to_string(),
        fence: FenceState::Unclosed,
    }
}

/// Byte length of a leading opening-fence line in `segment`, if any
///
/// Used when splicing a continuation: models frequently reopen the fence
/// they were writing in when asked to resume.
#[must_use]
pub fn leading_fence_len(segment: &str) -> Option<usize> {
    let trimmed = segment.trim_start_matches([' ', '\t', '\r', '\n']);
    let skipped = segment.len() - trimmed.len();
    let line_end = trimmed.find('\n').map_or(trimmed.len(), |i| i + 1);
    let line = &trimmed[..line_end];
    is_opening_fence(line).then_some(skipped + line_end)
}

/// Returns (start of the opening fence line, start of the body)
fn find_opening_fence(text: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if is_opening_fence(line) {
            return Some((offset, offset + line.len()));
        }
        offset += line.len();
    }
    None
}

fn is_opening_fence(line: &str) -> bool {
    let Some(tag) = line.trim().strip_prefix(FENCE) else {
        return false;
    };
    let tag = tag.trim();
    tag.is_empty() || CODE_FENCE_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}
