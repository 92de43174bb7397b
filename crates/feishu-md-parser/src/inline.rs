//! Inline text handling: bold runs and character cleanup.

use crate::block::TextRun;

/// Characters Feishu renders as visible garbage or rejects outright.
const ZERO_WIDTH: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Remove zero-width characters.
pub fn strip_zero_width(text: &str) -> String {
    text.chars().filter(|c| !ZERO_WIDTH.contains(c)).collect()
}

/// Split `text` into runs on `**` markers.
///
/// Odd segments are bold. Stray single `*` characters are dropped, as are
/// segments left empty. Whitespace at run boundaries is preserved so that
/// `a **b** c` keeps its spaces.
pub fn parse_inline(text: &str) -> Vec<TextRun> {
    text.split("**")
        .enumerate()
        .filter_map(|(idx, segment)| {
            let content = segment.replace('*', "");
            if content.is_empty() {
                None
            } else {
                Some(TextRun::new(content, idx % 2 == 1))
            }
        })
        .collect()
}

/// Normalise a table cell: trim, strip zero-width characters and bold
/// markers, keep the first line only.
pub fn clean_cell(raw: &str) -> String {
    let cleaned = strip_zero_width(raw.trim()).replace("**", "");
    cleaned
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_single_run() {
        let runs = parse_inline("hello world");
        assert_eq!(runs, vec![TextRun::new("hello world", false)]);
    }

    #[test]
    fn bold_segments_alternate() {
        let runs = parse_inline("a **b** c");
        assert_eq!(
            runs,
            vec![
                TextRun::new("a ", false),
                TextRun::new("b", true),
                TextRun::new(" c", false),
            ]
        );
    }

    #[test]
    fn leading_bold_drops_empty_first_segment() {
        let runs = parse_inline("**Note:** read this");
        assert_eq!(
            runs,
            vec![TextRun::new("Note:", true), TextRun::new(" read this", false)]
        );
    }

    #[test]
    fn stray_asterisks_removed() {
        let runs = parse_inline("*italic* text");
        assert_eq!(runs, vec![TextRun::new("italic text", false)]);
    }

    #[test]
    fn empty_input_has_no_runs() {
        assert!(parse_inline("").is_empty());
        assert!(parse_inline("****").is_empty());
    }

    #[test]
    fn zero_width_removed_from_runs() {
        let runs = parse_inline("a\u{200B}b\u{FEFF}");
        assert_eq!(runs[0].content, "ab");
    }

    #[test]
    fn clean_cell_strips_markers() {
        assert_eq!(clean_cell("  **Total**\u{200D} "), "Total");
        assert_eq!(clean_cell("   "), "");
    }
}
