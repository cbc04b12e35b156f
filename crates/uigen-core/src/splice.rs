//! Joining a continuation onto the artifact

use uigen_syntax::leading_fence_len;

/// Shortest repeated tail treated as overlap
pub const MIN_OVERLAP: usize = 12;
/// Longest repeated tail searched for
pub const MAX_OVERLAP: usize = 400;

/// Longest prefix of `rest` (at least [`MIN_OVERLAP`] bytes) that repeats
/// the end of `artifact`, or 0
#[must_use]
pub fn repeated_overlap(artifact: &str, rest: &str) -> usize {
    let longest = MAX_OVERLAP.min(artifact.len()).min(rest.len());
    (MIN_OVERLAP..=longest)
        .rev()
        .find(|&k| rest.is_char_boundary(k) && artifact.ends_with(&rest[..k]))
        .unwrap_or(0)
}

/// Append a continuation `segment` to `artifact`
///
/// A code-fence opener the model re-emitted at the start of the segment is
/// always dropped. The rest is appended unchanged, unless it starts with a
/// repeat of the artifact's end, `accepts` rejects the plain append and
/// accepts the append with the repeat removed. Generated markup repeats
/// whole lines (closing tags) legitimately, so the repeat alone is no proof
/// of duplication.
///
/// Returns the number of segment bytes dropped. The artifact only grows.
pub fn splice_continuation<F>(artifact: &mut String, segment: &str, accepts: F) -> usize
where
    F: Fn(&str) -> bool,
{
    if artifact.is_empty() {
        artifact.push_str(segment);
        return 0;
    }

    let fence = leading_fence_len(segment).unwrap_or(0);
    let rest = &segment[fence..];
    let overlap = repeated_overlap(artifact, rest);

    if overlap > 0 {
        let plain = format!("{artifact}{rest}");
        if !accepts(&plain) {
            let deduplicated = format!("{artifact}{}", &rest[overlap..]);
            if accepts(&deduplicated) {
                *artifact = deduplicated;
                tracing::debug!(fence, overlap, "continuation trimmed");
                return fence + overlap;
            }
        }
        tracing::trace!(overlap, "repeated tail kept");
        *artifact = plain;
    } else {
        artifact.push_str(rest);
    }

    if fence > 0 {
        tracing::debug!(fence, "re-opened fence dropped");
    }
    fence
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn anything(_: &str) -> bool {
        true
    }

    #[test]
    fn plain_append() {
        let mut artifact = String::from("const a = [1, 2");
        assert_eq!(splice_continuation(&mut artifact, ", 3];\n", anything), 0);
        assert_eq!(artifact, "const a = [1, 2, 3];\n");
    }

    #[test]
    fn first_segment_is_taken_whole() {
        let mut artifact = String::new();
        splice_continuation(&mut artifact, "```tsx\nconst a", anything);
        assert_eq!(artifact, "```tsx\nconst a");
    }

    #[test]
    fn reopened_fence_is_dropped() {
        let mut artifact = String::from("```tsx\nconst App = () => {\n");
        let dropped = splice_continuation(&mut artifact, "```tsx\n  return null;\n};\n```", anything);
        assert_eq!(dropped, "```tsx\n".len());
        assert_eq!(artifact, "```tsx\nconst App = () => {\n  return null;\n};\n```");
    }

    #[test]
    fn repeated_tail_is_removed_when_only_the_trimmed_text_is_accepted() {
        let mut artifact = String::from("function A() {\n  return <div className=\"card\">");
        let dropped = splice_continuation(
            &mut artifact,
            "<div className=\"card\"><p>hi</p></div>;\n}\n",
            |text| text.matches("<div").count() == text.matches("</div>").count(),
        );
        assert_eq!(dropped, "<div className=\"card\">".len());
        assert_eq!(
            artifact,
            "function A() {\n  return <div className=\"card\"><p>hi</p></div>;\n}\n"
        );
    }

    #[test]
    fn repeated_closing_line_is_kept_when_plain_append_is_accepted() {
        let mut artifact = String::from("  <div>\n        <div>\n        <p />\n        </div>\n");
        let dropped = splice_continuation(&mut artifact, "        </div>\n);\n", anything);
        assert_eq!(dropped, 0);
        assert_eq!(
            artifact,
            "  <div>\n        <div>\n        <p />\n        </div>\n        </div>\n);\n"
        );
    }

    #[test]
    fn repeat_is_kept_when_neither_candidate_is_accepted() {
        let mut artifact = String::from("let first = 1;\nlet second_value");
        let dropped = splice_continuation(&mut artifact, "let second_value = 2;", |_| false);
        assert_eq!(dropped, 0);
        assert_eq!(
            artifact,
            "let first = 1;\nlet second_valuelet second_value = 2;"
        );
    }

    #[test]
    fn acceptance_is_not_consulted_without_a_repeat() {
        let mut artifact = String::from("let x = 1;");
        splice_continuation(&mut artifact, ";\nlet y = 2;", |_| {
            panic!("no repeat to judge")
        });
        assert_eq!(artifact, "let x = 1;;\nlet y = 2;");
    }

    #[test]
    fn overlap_search() {
        assert_eq!(repeated_overlap("abc </section>\n", "</section>\n<p/>"), 0);
        assert_eq!(repeated_overlap("x  </section>\n", "  </section>\n<p/>"), 13);
    }

    #[test]
    fn multibyte_text_does_not_split() {
        let mut artifact = String::from("const s = \"✓✓✓✓✓✓\";");
        splice_continuation(&mut artifact, "✓✓\";\nconst t = 1;", anything);
        assert!(artifact.ends_with("const t = 1;"));
    }
}
