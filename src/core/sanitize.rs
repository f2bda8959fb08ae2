//! Output sanitizing for code-producing agent calls.

use std::sync::LazyLock;

use regex::Regex;

// Matches an opening ```<lang> fence and/or a closing ``` fence.
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^```[\w-]*\n?|\n?```\s*$").unwrap());

/// Remove markdown code fences some models wrap around code output despite
/// being told not to.
pub fn strip_code_fences(text: &str) -> String {
    FENCE_RE.replace_all(text, "").trim().to_string()
}
