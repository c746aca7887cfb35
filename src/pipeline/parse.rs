//! Split a model response into note items.

use crate::output::NoteItem;

/// One [`NoteItem`] per non-blank line, in order, text kept as written.
///
/// No markup is interpreted: a line like `**bold**` is lettered verbatim.
pub fn parse_notes(response: &str) -> Vec<NoteItem> {
    response
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(NoteItem::text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{NoteKind, NoteStyle};

    #[test]
    fn keeps_non_blank_lines_in_order() {
        let notes = parse_notes("Key idea: hello\n\n   \nKey idea: world\n");
        let content: Vec<_> = notes.iter().map(|n| n.content.as_str()).collect();
        assert_eq!(content, vec!["Key idea: hello", "Key idea: world"]);
        for n in &notes {
            assert_eq!(n.kind, NoteKind::Text);
            assert_eq!(n.style, NoteStyle::Normal);
            assert_eq!(n.position, None);
        }
    }

    #[test]
    fn lines_are_not_trimmed_or_interpreted() {
        let notes = parse_notes("  indented\n**bold** -> arrow");
        assert_eq!(notes[0].content, "  indented");
        assert_eq!(notes[1].content, "**bold** -> arrow");
    }

    #[test]
    fn crlf_is_a_line_break() {
        assert_eq!(parse_notes("a\r\nb").len(), 2);
        assert_eq!(parse_notes("a\r\nb")[0].content, "a");
    }

    #[test]
    fn empty_response_gives_no_notes() {
        assert!(parse_notes("").is_empty());
        assert!(parse_notes("\n \t\n").is_empty());
    }
}
