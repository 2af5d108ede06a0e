use sha2::{Digest, Sha256};

/// Normalizes a URL for deduplication
///
/// # Normalization Steps
///
/// 1. Strip surrounding whitespace
/// 2. Lowercase the whole string (scheme, host and path)
/// 3. Remove a single trailing slash
///
/// This is deliberately coarser than canonical URL normalization: two URLs
/// that differ only in case or a trailing slash are treated as the same page.
///
/// # Examples
///
/// ```
/// use cask_crawler::url::normalize_for_dedup;
///
/// assert_eq!(normalize_for_dedup("HTTP://Example.com/Path/"), "http://example.com/path");
/// ```
pub fn normalize_for_dedup(url: &str) -> String {
    let lowered = url.trim().to_lowercase();
    match lowered.strip_suffix('/') {
        Some(stripped) => stripped.to_string(),
        None => lowered,
    }
}

/// Computes the deduplication digest of a URL
///
/// The digest is the hex-encoded SHA-256 of [`normalize_for_dedup`], so it
/// always has 64 characters regardless of the URL length.
pub fn url_hash(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_for_dedup(url).as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases() {
        assert_eq!(
            normalize_for_dedup("https://EXAMPLE.com/Whisky"),
            "https://example.com/whisky"
        );
    }

    #[test]
    fn test_strips_whitespace() {
        assert_eq!(
            normalize_for_dedup("  https://example.com/a \n"),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_removes_single_trailing_slash() {
        assert_eq!(normalize_for_dedup("https://example.com/a/"), "https://example.com/a");
        assert_eq!(normalize_for_dedup("https://example.com/a//"), "https://example.com/a/");
    }

    #[test]
    fn test_root_slash_removed() {
        assert_eq!(normalize_for_dedup("https://example.com/"), "https://example.com");
    }

    #[test]
    fn test_query_is_preserved() {
        assert_eq!(
            normalize_for_dedup("https://example.com/p?ID=5"),
            "https://example.com/p?id=5"
        );
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = url_hash("https://example.com/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_collapses_case_and_slash_variants() {
        assert_eq!(
            url_hash("HTTP://Example.com/Path/"),
            url_hash("http://example.com/path")
        );
    }

    #[test]
    fn test_hash_differs_for_different_paths() {
        assert_ne!(url_hash("https://a.com/1"), url_hash("https://a.com/2"));
    }
}
