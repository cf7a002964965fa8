//! Post-processing: deterministic cleanup of engine-generated Markdown.
//!
//! Engine output varies with the input format. Spreadsheets come back with
//! CRLF line endings, scraped web pages carry zero-width spaces and BOMs,
//! and PDF text extraction leaves long runs of blank lines and trailing
//! spaces. None of that is content.
//!
//! The rules here only touch whitespace and invisible characters, never the
//! visible text. Joiners (U+200C, U+200D) are spelling in Persian and Indic
//! scripts and glue emoji sequences together, so they stay. A two-space
//! hard line break also stays. Whatever the rules produce is what gets
//! persisted, so a caller who reads the stored file gets exactly the text
//! the conversion returned.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so the per-line rules see `\n` only.
//! Invisible characters are stripped before trimming so a line holding only
//! a zero-width space becomes blank and can be collapsed.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to the raw engine output.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, word joiners)
/// 3. Trim trailing whitespace per line, keeping Markdown hard breaks
/// 4. Collapse 4+ consecutive newlines down to 3
/// 5. Ensure the text ends with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| {
            let trimmed = line.trim_end();
            let tail = &line[trimmed.len()..];
            if !trimmed.is_empty() && tail.len() >= 2 && tail.bytes().all(|b| b == b' ') {
                format!("{trimmed}  ")
            } else {
                trimmed.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 5: Ensure text ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}
