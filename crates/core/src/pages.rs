// crates/core/src/pages.rs
//! Splits generated multi-page text into per-page strings.
//!
//! The text generator is asked to answer in the shape
//!
//! ```text
//! Page 1: Once upon a time...
//! Page 2: The fox ran home.
//! ```
//!
//! but it does not always comply. Parsing therefore never fails: text without
//! any `Page <N>:` marker simply yields no pages.

use std::sync::OnceLock;

use regex_lite::Regex;

fn page_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"Page[ \t]+\d+[ \t]*:").expect("page marker regex is valid"))
}

/// Split `text` into the content following each `Page <N>:` marker.
///
/// Pages are returned in order of appearance. The numeric label is not
/// checked against the position, and content is trimmed of surrounding
/// whitespace (a marker followed directly by another marker gives `""`).
pub fn parse_pages(text: &str) -> Vec<String> {
    let markers: Vec<_> = page_marker().find_iter(text).collect();

    markers
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let end = markers.get(i + 1).map_or(text.len(), |next| next.start());
            text[m.end()..end].trim().to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_two_pages() {
        assert_eq!(parse_pages("Page 1: A\nPage 2: B"), vec!["A", "B"]);
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_pages("").is_empty());
    }

    #[test]
    fn test_parse_without_markers() {
        assert!(parse_pages("no markers here").is_empty());
    }

    #[test]
    fn test_parse_marker_with_empty_content() {
        assert_eq!(parse_pages("Page 1:Page 2: second"), vec!["", "second"]);
        assert_eq!(parse_pages("Page 1: first\nPage 2:"), vec!["first", ""]);
    }

    #[test]
    fn test_parse_keeps_input_order_not_label_order() {
        let text = "Page 3: three\nPage 1: one\nPage 2: two";
        assert_eq!(parse_pages(text), vec!["three", "one", "two"]);
    }

    #[test]
    fn test_parse_multiline_content_and_preamble() {
        let text = "Here is your book!\n\nPage 1:\nThe fox woke up.\nIt was sunny.\n\nPage 2:\nThe fox slept.\n";
        assert_eq!(
            parse_pages(text),
            vec!["The fox woke up.\nIt was sunny.", "The fox slept."]
        );
    }

    #[test]
    fn test_parse_multi_digit_labels() {
        let text = "Page 9: nine Page 10: ten Page 11: eleven";
        assert_eq!(parse_pages(text), vec!["nine", "ten", "eleven"]);
    }

    #[test]
    fn test_parse_is_pure() {
        let text = "Page 1: A\nPage 2: B\nPage 3: C";
        assert_eq!(parse_pages(text), parse_pages(text));
    }
}
