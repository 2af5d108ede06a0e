//! Link discovery on accepted pages
//!
//! The crawl worker feeds same-domain links from every accepted page back into
//! its queue. Only anchors are followed; a page's canonical URL is reported
//! separately so callers can tell a listing from a product detail page.

use crate::url::extract_domain;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static CANONICAL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link[rel='canonical'][href]").unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());

/// File extensions that never lead to a product page
const SKIPPED_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".pdf", ".zip", ".css", ".js", ".xml",
];

/// What a page links to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// Text of the `<title>` element
    pub title: Option<String>,

    /// `<link rel="canonical">` target, resolved
    pub canonical: Option<String>,

    /// Absolute anchor targets in page order, fragments removed, no repeats
    pub links: Vec<String>,
}

/// Parses `html` fetched from `base_url`
///
/// # Example
///
/// ```
/// use cask_crawler::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<title>Lagavulin 16</title><a href="/whisky/lagavulin-16#notes">Notes</a>"#;
/// let base = Url::parse("https://shop.example.com/islay").unwrap();
/// let page = parse_html(html, &base);
/// assert_eq!(page.title.as_deref(), Some("Lagavulin 16"));
/// assert_eq!(page.links, vec!["https://shop.example.com/whisky/lagavulin-16"]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty());

    let canonical = document
        .select(&CANONICAL)
        .filter_map(|element| element.value().attr("href"))
        .find_map(|href| resolve_link(href, base_url));

    let mut seen = HashSet::new();
    let links = document
        .select(&ANCHOR)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .filter(|link| seen.insert(link.clone()))
        .collect();

    ParsedPage {
        title,
        canonical,
        links,
    }
}

/// Links on the page whose domain equals `domain`
pub fn same_domain_links(html: &str, base_url: &Url, domain: &str) -> Vec<String> {
    parse_html(html, base_url)
        .links
        .into_iter()
        .filter(|link| extract_domain(link).is_ok_and(|d| d == domain))
        .collect()
}

/// Resolves `href` against `base_url`
///
/// Returns `None` for non-HTTP schemes, same-page anchors and static assets.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut url = base_url.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    let path = url.path().to_ascii_lowercase();
    if SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return None;
    }

    url.set_fragment(None);
    Some(url.to_string())
}
