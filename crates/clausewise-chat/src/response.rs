//! Reply cleanup: reasoning extraction, markup stripping, disclosures.

use clausewise_core::AnalysisResult;
use once_cell::sync::Lazy;
use regex::Regex;

/// Prepended when the answer was produced from a cut-down excerpt.
pub const TRUNCATION_DISCLOSURE: &str = "Important Note: This analysis is based on a strategic extraction of the contract that includes:
- The beginning (definitions, main terms)
- Key sections (payment, IP rights, termination, liability, etc.)
- The ending (important clauses, dispute resolution, etc.)

Some middle sections may have been omitted. For a complete analysis, please review the full contract with legal counsel.

";

/// Prepended when only the flat leading fallback excerpt was analyzed.
pub const FALLBACK_DISCLOSURE: &str = "Note: Due to contract length, only the first portion was analyzed. \
Please review the full contract with legal counsel.

";

/// Tagged reasoning, optionally wrapped in backticks or a code fence.
static REASONING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)`{0,3}<(?:think|thinking|reasoning)>`{0,3}(.*?)`{0,3}</(?:think|thinking|reasoning)>`{0,3}",
    )
    .unwrap()
});

static CODE_BLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*\n?(.*?)```").unwrap());
static RULE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*(?:-{3,}|\*{3,}|_{3,})[ \t]*$").unwrap());
static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+").unwrap());
static BOLD_STAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static BOLD_UNDERSCORE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__(.+?)__").unwrap());
static ITALIC_STAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*\n]+)\*").unwrap());
// Underscores inside identifiers (clause_4_b) are left alone.
static ITALIC_UNDERSCORE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)(^|[^\w])_([^_\n]+)_([^\w]|$)").unwrap());
static INLINE_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+)`").unwrap());
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Split reasoning from the answer. Multiple reasoning blocks are joined with
/// blank lines in order of appearance; `None` when there is none.
pub fn split_reasoning(raw: &str) -> (String, Option<String>) {
    let blocks: Vec<&str> = REASONING_RE
        .captures_iter(raw)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect();
    let main = REASONING_RE.replace_all(raw, "").into_owned();
    let reasoning = (!blocks.is_empty()).then(|| blocks.join("\n\n"));
    (main, reasoning)
}

/// Remove lightweight Markdown and collapse runs of blank lines.
pub fn strip_markup(text: &str) -> String {
    let text = CODE_BLOCK_RE.replace_all(text, "${1}");
    let text = RULE_RE.replace_all(&text, "");
    let text = HEADER_RE.replace_all(&text, "");
    let text = BOLD_STAR_RE.replace_all(&text, "${1}");
    let text = BOLD_UNDERSCORE_RE.replace_all(&text, "${1}");
    let text = ITALIC_STAR_RE.replace_all(&text, "${1}");
    let text = ITALIC_UNDERSCORE_RE.replace_all(&text, "${1}${2}${3}");
    let text = INLINE_CODE_RE.replace_all(&text, "${1}");
    let text = BLANK_RUN_RE.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Turn a raw model reply into the displayable result.
pub fn process(raw: &str, was_truncated: bool, used_fallback: bool) -> AnalysisResult {
    let (main, reasoning) = split_reasoning(raw);
    let mut main_response = strip_markup(&main);

    if used_fallback {
        main_response.insert_str(0, FALLBACK_DISCLOSURE);
    } else if was_truncated {
        main_response.insert_str(0, TRUNCATION_DISCLOSURE);
    }

    AnalysisResult {
        main_response,
        reasoning,
        was_truncated: was_truncated || used_fallback,
    }
}
