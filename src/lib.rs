//! Cask Crawler: crawl frontier and tiered-fetch escalation engine
//!
//! This crate keeps the pending-work frontier for a spirits/wine product
//! crawler, deduplicates URLs against a fast store backed by durable crawl
//! history, and decides when a fetch has to be retried through a more
//! capable (and more expensive) fetching tier.

pub mod classifier;
pub mod config;
pub mod cookies;
pub mod crawler;
pub mod escalation;
pub mod frontier;
pub mod history;
pub mod state;
pub mod store;
pub mod url;

use thiserror::Error;

/// Main error type for Cask Crawler operations
#[derive(Debug, Error)]
pub enum CaskError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Cask Crawler operations
pub type Result<T> = std::result::Result<T, CaskError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use cookies::{CookieSet, DomainCookieCache};
pub use escalation::{should_escalate, EscalationReason, EscalationResult, FetchTier};
pub use frontier::{AddOptions, Frontier, QueueEntry, SeenUrlStore};
pub use store::{KvStore, MemoryStore, SqliteStore, StoreError, StoreResult};
pub use url::{extract_domain, normalize_for_dedup, url_hash};
