//! Deterministic cleanup of model output before it is split into notes.
//!
//! Even with a plain-text prompt, models wrap answers in code fences, emit
//! CRLF, sprinkle zero-width characters, or prefix each line with a bullet.
//! These rules remove that noise without touching the note wording.
//!
//! Rules (applied in order):
//! 1. Strip an outer code fence
//! 2. Normalise line endings (CRLF / CR → LF)
//! 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, joiners)
//! 4. Drop a leading bullet marker (`- `, `* `, `• `) from each line
//! 5. Trim trailing whitespace per line

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw model output.
pub fn clean_response(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = strip_bullets(&s);
    trim_trailing_whitespace(&s)
}

// ── Rule 1: Strip outer fence ────────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:markdown|md|text|plaintext)?\r?\n(.*?)\r?\n```\s*$").unwrap()
});

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
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

// ── Rule 4: Strip bullet markers ─────────────────────────────────────────────

static RE_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-*•][ \t]+").unwrap());

fn strip_bullets(input: &str) -> String {
    RE_BULLET.replace_all(input, "").to_string()
}

// ── Rule 5: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fence_with_language() {
        assert_eq!(strip_outer_fence("```text\nA\nB\n```"), "A\nB");
        assert_eq!(strip_outer_fence("```\nA\n```\n"), "A");
    }

    #[test]
    fn inner_fences_are_kept() {
        let input = "Intro\n```\ncode\n```";
        assert_eq!(strip_outer_fence(input), input);
    }

    #[test]
    fn normalises_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn removes_invisible_chars() {
        assert_eq!(remove_invisible_chars("Key\u{200B} idea\u{FEFF}"), "Key idea");
    }

    #[test]
    fn strips_bullets_but_not_hyphenated_words() {
        let input = "- first\n  * second\n• third\nwell-known -> fact";
        assert_eq!(strip_bullets(input), "first\nsecond\nthird\nwell-known -> fact");
    }

    #[test]
    fn full_cleanup() {
        let raw = "```\r\n- Key idea: hello  \r\n- Key idea: world\u{200B}\r\n```";
        assert_eq!(clean_response(raw), "Key idea: hello\nKey idea: world");
    }
}
