use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Removes every HTML tag from `html`
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

/// Tag-stripped text with runs of whitespace collapsed to single spaces
pub fn visible_text(html: &str) -> String {
    strip_tags(html)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Number of characters in the visible text of `html`
pub fn visible_len(html: &str) -> usize {
    visible_text(html).chars().count()
}

/// Returns at most `max_bytes` of `content` starting at `start`, cut on a char boundary
pub fn window(content: &str, start: usize, max_bytes: usize) -> &str {
    let start = start.min(content.len());
    let mut end = start.saturating_add(max_bytes).min(content.len());
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>Hello <b>world</b></p>"), "Hello world");
    }

    #[test]
    fn test_visible_text_collapses_whitespace() {
        assert_eq!(
            visible_text("<div>\n  Highland   <span>Single Malt</span>\n</div>"),
            "Highland Single Malt"
        );
    }

    #[test]
    fn test_visible_len_of_empty_shell() {
        assert_eq!(visible_len(r#"<div id="root"></div>"#), 0);
    }

    #[test]
    fn test_visible_len_counts_chars_not_bytes() {
        assert_eq!(visible_len("<p>Ch\u{e2}teau</p>"), 7);
    }

    #[test]
    fn test_window_respects_char_boundaries() {
        let content = "ab\u{e9}cd";
        assert_eq!(window(content, 0, 3), "ab");
        assert_eq!(window(content, 2, 10), "\u{e9}cd");
        assert_eq!(window(content, 10, 10), "");
    }
}
