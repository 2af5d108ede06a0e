use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the domain a URL belongs to
///
/// The host is lower-cased and a leading `www.` is dropped so that
/// `https://www.Example.com/a` and `https://example.com/b` share one cookie
/// jar and one set of fetch statistics.
///
/// # Arguments
///
/// * `url` - The URL string to extract the domain from
///
/// # Returns
///
/// * `Ok(String)` - The lowercase domain
/// * `Err(UrlError)` - The URL is malformed, not HTTP(S), or has no host
///
/// # Examples
///
/// ```
/// use cask_crawler::url::extract_domain;
///
/// assert_eq!(extract_domain("https://WWW.Example.com/path").unwrap(), "example.com");
/// assert_eq!(extract_domain("https://shop.example.com/").unwrap(), "shop.example.com");
/// ```
pub fn extract_domain(url: &str) -> UrlResult<String> {
    let parsed = Url::parse(url.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(UrlError::InvalidScheme(parsed.scheme().to_string()));
    }

    let host = parsed.host_str().ok_or(UrlError::MissingDomain)?;
    let host = host.to_lowercase();

    Ok(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Normalizes a bare domain name used as a cache key
pub fn normalize_domain_key(domain: &str) -> String {
    let domain = domain.trim().to_lowercase();
    domain.strip_prefix("www.").unwrap_or(&domain).to_string()
}
