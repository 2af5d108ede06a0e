use crate::classifier::markers::*;
use crate::classifier::text::{strip_tags, visible_len, window};
use regex::Regex;
use std::sync::LazyLock;

static MOUNT_POINTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    MOUNT_POINT_PATTERNS
        .iter()
        .map(|pattern| Regex::new(pattern).unwrap())
        .collect()
});

fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| haystack.contains(marker))
}

/// Detects a Cloudflare-style browser challenge interstitial
///
/// Only pages under 50,000 bytes can be challenges. Within that limit, a
/// strong marker ("checking your browser", challenge-script tokens) is
/// enough. A weak marker such as "cloudflare ray id" only counts on pages
/// under 10,000 bytes whose visible text is under 1,000 characters, so a
/// real product page that mentions the CDN in its footer is not flagged.
///
/// # Examples
///
/// ```
/// use cask_crawler::classifier::is_cloudflare_challenge;
///
/// assert!(is_cloudflare_challenge("<title>Just a moment...</title>"));
/// let big_page = format!("{}Cloudflare Ray ID", "x".repeat(60_000));
/// assert!(!is_cloudflare_challenge(&big_page));
/// ```
pub fn is_cloudflare_challenge(content: &str) -> bool {
    if content.len() >= CHALLENGE_MAX_BYTES {
        return false;
    }

    let lowered = content.to_lowercase();
    if contains_any(&lowered, CHALLENGE_STRONG_MARKERS) {
        return true;
    }

    content.len() < SPARSE_CHALLENGE_MAX_BYTES
        && contains_any(&lowered, CHALLENGE_WEAK_MARKERS)
        && visible_len(content) < SPARSE_CHALLENGE_MAX_TEXT
}

/// Detects a CAPTCHA wall (reCAPTCHA, hCaptcha, Turnstile, DataDome, ...)
pub fn is_captcha_page(content: &str) -> bool {
    contains_any(&content.to_lowercase(), CAPTCHA_MARKERS)
}

/// Detects a client-side rendered shell whose content needs JavaScript
///
/// True when an SPA mount point is followed by fewer than 100 characters of
/// visible text, or when the page carries an "enable JavaScript" message.
pub fn is_javascript_placeholder(content: &str) -> bool {
    for pattern in MOUNT_POINTS.iter() {
        if let Some(found) = pattern.find(content) {
            let following = window(content, found.end(), MOUNT_POINT_WINDOW_BYTES);
            let text = strip_tags(following);
            if text.trim().chars().count() < MOUNT_POINT_MAX_TEXT {
                return true;
            }
        }
    }

    contains_any(&content.to_lowercase(), NOSCRIPT_MESSAGES)
}

/// Detects a page with no real content yet
///
/// True when the visible text is under 50 characters, or under 200
/// characters with a loading indicator present.
pub fn is_empty_or_loading(content: &str) -> bool {
    let text_len = visible_len(content);
    if text_len < EMPTY_MAX_TEXT {
        return true;
    }

    text_len < LOADING_MAX_TEXT && contains_any(&content.to_lowercase(), LOADING_MARKERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_page(extra: &str) -> String {
        let description = "A rich, sherried Speyside single malt with notes of dried fruit, \
                           dark chocolate and orange peel. Matured in Oloroso casks for twelve years. "
            .repeat(20);
        format!(
            "<html><head><title>Glen Example 12</title></head><body><h1>Glen Example 12</h1>\
             <p>{}</p>{}</body></html>",
            description, extra
        )
    }

    // ===== Cloudflare =====

    #[test]
    fn test_challenge_strong_marker() {
        let page = "<html><head><title>Just a moment...</title></head>\
                    <body>Checking your browser before accessing wine.com</body></html>";
        assert!(is_cloudflare_challenge(page));
    }

    #[test]
    fn test_challenge_marker_case_insensitive() {
        assert!(is_cloudflare_challenge("<p>CHECKING YOUR BROWSER</p>"));
        assert!(is_cloudflare_challenge("<script>window._cf_chl_opt={}</script>"));
    }

    #[test]
    fn test_large_page_with_ray_id_is_not_challenge() {
        let mut page = "<p>Cloudflare Ray ID: 8a1b2c3d</p>".to_string();
        page.push_str(&"x".repeat(60_000 - page.len()));
        assert_eq!(page.len(), 60_000);
        assert!(!is_cloudflare_challenge(&page));
    }

    #[test]
    fn test_large_page_with_strong_marker_is_not_challenge() {
        let page = format!("<p>just a moment...</p>{}", " ".repeat(50_000));
        assert!(!is_cloudflare_challenge(&page));
    }

    #[test]
    fn test_sparse_page_with_weak_marker_is_challenge() {
        let page = "<html><body><h1>Attention Required!</h1>\
                    <p>Cloudflare Ray ID: 8a1b2c3d</p></body></html>";
        assert!(is_cloudflare_challenge(page));
    }

    #[test]
    fn test_product_page_with_cdn_footer_is_not_challenge() {
        let page = product_page("<footer>Performance &amp; security by Cloudflare</footer>");
        assert!(page.len() < SPARSE_CHALLENGE_MAX_BYTES);
        assert!(!is_cloudflare_challenge(&page));
    }

    #[test]
    fn test_mid_sized_page_with_weak_marker_is_not_challenge() {
        let page = format!("<p>cloudflare</p>{}", "<div></div>".repeat(1_500));
        assert!(page.len() >= SPARSE_CHALLENGE_MAX_BYTES);
        assert!(page.len() < CHALLENGE_MAX_BYTES);
        assert!(!is_cloudflare_challenge(&page));
    }

    // ===== CAPTCHA =====

    #[test]
    fn test_recaptcha_widget() {
        assert!(is_captcha_page(
            r#"<div class="g-recaptcha" data-sitekey="6Lc..."></div>"#
        ));
    }

    #[test]
    fn test_hcaptcha_case_insensitive() {
        assert!(is_captcha_page(r#"<DIV CLASS="H-CAPTCHA"></DIV>"#));
    }

    #[test]
    fn test_turnstile() {
        assert!(is_captcha_page(r#"<div class="cf-turnstile"></div>"#));
    }

    #[test]
    fn test_hidden_response_field() {
        assert!(is_captcha_page(
            r#"<textarea name="g-recaptcha-response" style="display:none"></textarea>"#
        ));
    }

    #[test]
    fn test_plain_page_is_not_captcha() {
        assert!(!is_captcha_page(&product_page("")));
    }

    // ===== JavaScript placeholder =====

    #[test]
    fn test_empty_root_div() {
        assert!(is_javascript_placeholder(r#"<div id="root"></div>"#));
    }

    #[test]
    fn test_empty_next_container() {
        let page = r#"<html><body><div id="__next"></div><script src="/_next/main.js"></script></body></html>"#;
        assert!(is_javascript_placeholder(page));
    }

    #[test]
    fn test_angular_root() {
        assert!(is_javascript_placeholder(
            "<body><app-root></app-root></body>"
        ));
    }

    #[test]
    fn test_server_rendered_root_is_not_placeholder() {
        let page = format!(
            r#"<div id="root"><h1>Glen Example 12</h1><p>{}</p></div>"#,
            "Sherry cask matured single malt whisky. ".repeat(5)
        );
        assert!(!is_javascript_placeholder(&page));
    }

    #[test]
    fn test_noscript_message() {
        let page = product_page(
            "<noscript>You need to enable JavaScript to run this app.</noscript>",
        );
        assert!(is_javascript_placeholder(&page));
    }

    #[test]
    fn test_plain_page_is_not_placeholder() {
        assert!(!is_javascript_placeholder(&product_page("")));
    }

    // ===== Empty / loading =====

    #[test]
    fn test_empty_page() {
        assert!(is_empty_or_loading("<html><body></body></html>"));
        assert!(is_empty_or_loading(r#"<div id="root"></div>"#));
    }

    #[test]
    fn test_short_text_is_empty() {
        assert!(is_empty_or_loading("<p>Not much here</p>"));
    }

    #[test]
    fn test_loading_indicator_with_short_text() {
        let page = format!(
            r#"<div class="spinner"></div><p>{}</p>"#,
            "Fetching the latest prices for you. ".repeat(3)
        );
        let len = visible_len(&page);
        assert!((EMPTY_MAX_TEXT..LOADING_MAX_TEXT).contains(&len));
        assert!(is_empty_or_loading(&page));
    }

    #[test]
    fn test_medium_text_without_loader_is_not_empty() {
        let page = format!("<p>{}</p>", "Fetching the latest prices for you. ".repeat(3));
        assert!(!is_empty_or_loading(&page));
    }

    #[test]
    fn test_loading_indicator_with_long_text_is_not_loading() {
        assert!(!is_empty_or_loading(&product_page(
            r#"<div class="loader"></div>"#
        )));
    }
}
