//! Post-processing: deterministic cleanup of OCR output.
//!
//! Tesseract's raw output carries engine artefacts that add nothing for a
//! human dispatcher or the summarizer: a trailing form feed per page, CRLF
//! line endings on some builds, runs of blank lines where the scan had white
//! space, typographic ligatures and invisible Unicode picked up from noise.
//!
//! The rules below remove those artefacts without touching the words
//! themselves. They apply to recognised text only; native PDF text is passed
//! through as extracted (trimmed).
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule sees `\n` only, and
//! per-line trimming runs before blank-line collapsing so whitespace-only
//! lines count as blank.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to raw recognizer output.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip control characters other than `\n` and `\t` (form feeds etc.)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Expand typographic ligatures (`ﬁ` → `fi`)
/// 5. Trim trailing whitespace per line
/// 6. Collapse 3+ consecutive newlines to a single blank line
/// 7. Trim the whole text
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_control_chars(&s);
    let s = remove_invisible_chars(&s);
    let s = expand_ligatures(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip control characters ─────────────────────────────────────────

fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect()
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Expand ligatures ────────────────────────────────────────────────

fn expand_ligatures(input: &str) -> String {
    const LIGATURES: &[(char, &str)] = &[
        ('\u{FB00}', "ff"),
        ('\u{FB01}', "fi"),
        ('\u{FB02}', "fl"),
        ('\u{FB03}', "ffi"),
        ('\u{FB04}', "ffl"),
    ];
    if !input.chars().any(|c| ('\u{FB00}'..='\u{FB04}').contains(&c)) {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match LIGATURES.iter().find(|(l, _)| *l == c) {
            Some((_, expanded)) => out.push_str(expanded),
            None => out.push(c),
        }
    }
    out
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

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_strip_form_feed() {
        assert_eq!(strip_control_chars("Rate: $1800\n\x0c"), "Rate: $1800\n");
        assert_eq!(strip_control_chars("a\tb\x07c"), "a\tbc");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_expand_ligatures() {
        assert_eq!(expand_ligatures("\u{FB01}ne \u{FB02}at"), "fine flat");
        assert_eq!(expand_ligatures("plain"), "plain");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  hello   \nworld  "),
            "  hello\nworld"
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_blank_page_is_empty() {
        assert_eq!(clean_text(" \n\x0c"), "");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_clean_text_full_pipeline() {
        let input = "  PU: 10/14 08:00   \r\n \r\n\r\n\r\nSHIPPER \u{FB01}RM\u{200B}\n\x0c";
        assert_eq!(clean_text(input), "PU: 10/14 08:00\n\nSHIPPER fiRM");
    }
}
