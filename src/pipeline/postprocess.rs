//! Post-processing: deterministic cleanup of LLM-returned page text.
//!
//! Even well-prompted models occasionally wrap the answer in a code fence,
//! prefix it with "Here is the corrected text:", or return CRLF line endings.
//! These rules fix such quirks without touching content. They also remove
//! form feeds, which guarantees the merged file's default page separator
//! never appears inside a page.
//!
//! ## Rule Order
//!
//! Normalise line endings before anything line-based, strip the fence before
//! the preamble (a preamble may sit outside the fence), and trim last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to the raw LLM output.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip a chatty preamble line ("Here is the cleaned text:")
/// 3. Strip outer code fences
/// 4. Strip invisible Unicode and form feeds
/// 5. Trim trailing whitespace per line
/// 6. Collapse 3+ consecutive newlines down to one blank line
/// 7. Trim leading/trailing blank space
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_preamble(&s);
    let s = strip_code_fences(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip preamble ───────────────────────────────────────────────────

static RE_PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:here\s+is|here's)\s+the\s+(?:corrected|cleaned|cleaned-up|transcribed)\s+text\s*:?[ \t]*\n",
    )
    .unwrap()
});

fn strip_preamble(input: &str) -> String {
    RE_PREAMBLE.replace(input, "").to_string()
}

// ── Rule 3: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\n(.*)\n```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 4: Remove invisible characters ──────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{000C}',
        ],
        "",
    )
}

// ── Rule 5: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 6: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}
