use serde::Deserialize;

/// Main configuration structure for Cask Crawler
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub cookies: CookieConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Which backend holds the frontier, seen sets and cookie cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Backing store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Path to the SQLite file holding queues, seen sets and cookies
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Path to the SQLite file holding crawl history and domain statistics
    #[serde(rename = "history-path", default = "default_history_path")]
    pub history_path: String,

    /// Prefix for every key written to the backing store
    #[serde(rename = "key-prefix", default = "default_key_prefix")]
    pub key_prefix: String,
}

/// Tier-1 HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Total request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,
}

/// Domain cookie cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    /// Lifetime of a stored cookie set (seconds)
    #[serde(rename = "default-ttl-secs", default = "default_cookie_ttl_secs")]
    pub default_ttl_secs: u64,
}

/// Crawl worker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Admit same-domain links found on accepted pages
    #[serde(rename = "discover-links", default = "default_discover_links")]
    pub discover_links: bool,

    /// Stop after this many pages (unbounded when absent)
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<usize>,
}

fn default_database_path() -> String {
    "./frontier.db".to_string()
}

fn default_history_path() -> String {
    "./history.db".to_string()
}

fn default_key_prefix() -> String {
    "crawler".to_string()
}

fn default_user_agent() -> String {
    format!("CaskCrawler/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_redirects() -> usize {
    10
}

fn default_cookie_ttl_secs() -> u64 {
    86_400
}

fn default_discover_links() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            database_path: default_database_path(),
            history_path: default_history_path(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_cookie_ttl_secs(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            discover_links: default_discover_links(),
            max_pages: None,
        }
    }
}
