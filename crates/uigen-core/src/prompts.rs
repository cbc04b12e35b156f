//! Prompt text sent to the generation service

use uigen_policy::AllowList;
use uigen_syntax::Diagnostic;

/// Fixed instruction appended after a truncated answer
pub const CONTINUE_INSTRUCTION: &str = "Your previous message was cut off. Continue exactly where \
it stopped, starting with the very next character. Do not repeat any earlier text, do not add \
any explanation, and do not open a new code fence.";

fn dependency_rule(allow_list: &AllowList) -> String {
    if allow_list.is_empty() {
        "DEPENDENCIES: Do not import any external module.".to_string()
    } else {
        format!("DEPENDENCIES: Only import from: {allow_list}. No other external libraries.")
    }
}

/// First prompt of a request
#[must_use]
pub fn initial_prompt(requirement: &str, allow_list: &AllowList) -> String {
    format!(
        "Create a UI component for the following requirement.\n\n\
         REQUIREMENT:\n{}\n\n\
         {}\n\n\
         Return a single TypeScript (TSX) functional component in one ```tsx code block.",
        requirement.trim(),
        dependency_rule(allow_list),
    )
}

/// Corrective instruction after a malformed attempt
#[must_use]
pub fn malformed_rewrite(diagnostic: Option<&Diagnostic>) -> String {
    let mut prompt = String::from("Your previous attempt was syntactically malformed");
    if let Some(location) = diagnostic.and_then(|d| d.location) {
        prompt.push_str(&format!(
            " (first error at line {}, column {})",
            location.line, location.column
        ));
    }
    prompt.push_str(
        ". Discard it and regenerate the complete component cleanly, as valid TSX in one \
         ```tsx code block.",
    );
    prompt
}

/// Corrective instruction after a policy violation
///
/// `modules` is expected sorted and deduplicated.
#[must_use]
pub fn violation_rewrite(modules: &[&str], allow_list: &AllowList) -> String {
    let named = modules
        .iter()
        .map(|m| format!("'{m}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Your previous attempt imported modules that are not allowed: {named}. Rewrite the \
         complete component without them, using only the allowed capabilities.\n\n{}",
        dependency_rule(allow_list),
    )
}
