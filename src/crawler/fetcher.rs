//! Tier fetchers
//!
//! Every fetch tier implements [`TierFetcher`]. This crate ships the tier-1
//! [`HttpFetcher`]; browser-backed tiers are registered by the embedding
//! application through [`TierFetchers`].

use crate::config::FetcherConfig;
use crate::cookies::CookieSet;
use crate::escalation::FetchTier;
use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{redirect::Policy, Client};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// A page returned by a fetch tier
///
/// Non-success status codes are still pages; the escalation policy decides
/// what they mean.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code
    pub status_code: u16,

    /// Response body
    pub body: String,

    /// Cookies the server set on this response
    pub set_cookies: CookieSet,
}

/// What went wrong below the HTTP layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    Timeout,
    Connect,
    Redirect,
    Body,
    Status,
    Other,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Timeout => "timeout",
            Self::Connect => "connection failed",
            Self::Redirect => "redirect error",
            Self::Body => "body error",
            Self::Status => "bad status",
            Self::Other => "fetch error",
        };
        f.write_str(name)
    }
}

/// A fetch attempt that produced no page
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FetchErrorKind::Timeout
        } else if err.is_connect() {
            FetchErrorKind::Connect
        } else if err.is_redirect() {
            FetchErrorKind::Redirect
        } else if err.is_body() || err.is_decode() {
            FetchErrorKind::Body
        } else if err.is_status() {
            FetchErrorKind::Status
        } else {
            FetchErrorKind::Other
        };

        Self::new(kind, err.to_string())
    }
}

/// One fetch strategy
#[async_trait]
pub trait TierFetcher: Send + Sync {
    /// The tier this fetcher implements
    fn tier(&self) -> FetchTier;

    /// Fetches `url`, sending `cookies` when present
    async fn fetch(&self, url: &str, cookies: Option<&CookieSet>)
        -> Result<FetchedPage, FetchError>;
}

/// Registered fetchers, at most one per tier
#[derive(Clone, Default)]
pub struct TierFetchers {
    fetchers: HashMap<FetchTier, Arc<dyn TierFetcher>>,
}

impl TierFetchers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `fetcher` under its own tier, replacing any previous one
    pub fn register(&mut self, fetcher: Arc<dyn TierFetcher>) -> &mut Self {
        self.fetchers.insert(fetcher.tier(), fetcher);
        self
    }

    pub fn get(&self, tier: FetchTier) -> Option<Arc<dyn TierFetcher>> {
        self.fetchers.get(&tier).cloned()
    }

    pub fn has(&self, tier: FetchTier) -> bool {
        self.fetchers.contains_key(&tier)
    }

    /// Registered tiers, cheapest first
    pub fn tiers(&self) -> Vec<FetchTier> {
        FetchTier::ALL
            .into_iter()
            .filter(|tier| self.has(*tier))
            .collect()
    }
}

/// Builds the tier-1 HTTP client
///
/// # Arguments
///
/// * `config` - Fetcher settings
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(config.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Lightweight HTTP client, tier 1
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TierFetcher for HttpFetcher {
    fn tier(&self) -> FetchTier {
        FetchTier::Http
    }

    async fn fetch(
        &self,
        url: &str,
        cookies: Option<&CookieSet>,
    ) -> Result<FetchedPage, FetchError> {
        let mut request = self.client.get(url);
        if let Some(header) = cookies.and_then(cookie_header) {
            request = request.header(COOKIE, header);
        }

        let response = request.send().await?;
        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();

        let set_cookies = parse_set_cookies(
            response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok()),
        );

        let body = response.text().await?;

        Ok(FetchedPage {
            final_url,
            status_code,
            body,
            set_cookies,
        })
    }
}

/// Formats a `Cookie` request header, or `None` for an empty set
pub fn cookie_header(cookies: &CookieSet) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }

    Some(
        cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Collects `name=value` pairs from `Set-Cookie` header values
///
/// Attributes after the first `;` are ignored. Later headers win.
pub fn parse_set_cookies<'a>(headers: impl IntoIterator<Item = &'a str>) -> CookieSet {
    let mut cookies = CookieSet::new();
    for header in headers {
        let pair = header.split(';').next().unwrap_or_default();
        if let Some((name, value)) = pair.split_once('=') {
            let name = name.trim();
            if !name.is_empty() {
                cookies.insert(name.to_string(), value.trim().to_string());
            }
        }
    }
    cookies
}
