//! Database schema definitions for the SQLite-backed stores
//!
//! The key-value schema backs `SqliteStore`; the history schema backs
//! `SqliteHistory`. Both are idempotent and may share one database file.

/// SQL schema for the key-value/sorted-set store
pub const KV_SCHEMA_SQL: &str = r#"
-- Strings and counters
CREATE TABLE IF NOT EXISTS kv_strings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Set members
CREATE TABLE IF NOT EXISTS kv_sets (
    key TEXT NOT NULL,
    member TEXT NOT NULL,
    PRIMARY KEY (key, member)
);

-- Sorted-set members; seq breaks score ties in insertion order
CREATE TABLE IF NOT EXISTS kv_zsets (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT NOT NULL,
    member TEXT NOT NULL,
    score INTEGER NOT NULL,
    UNIQUE (key, member)
);

CREATE INDEX IF NOT EXISTS idx_kv_zsets_order ON kv_zsets(key, score, seq);

-- Key expiry (unix milliseconds), applies to every key type
CREATE TABLE IF NOT EXISTS kv_expiry (
    key TEXT PRIMARY KEY,
    expires_at INTEGER NOT NULL
);
"#;

/// SQL schema for durable crawl history and per-domain fetch statistics
pub const HISTORY_SCHEMA_SQL: &str = r#"
-- URLs that have been fully crawled
CREATE TABLE IF NOT EXISTS crawled_urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    status_code INTEGER,
    tier INTEGER,
    crawled_at TEXT NOT NULL
);

-- URLs that already produced a discovered product
CREATE TABLE IF NOT EXISTS discovered_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    discovered_at TEXT NOT NULL
);

-- Per-domain, per-tier fetch outcomes
CREATE TABLE IF NOT EXISTS domain_stats (
    domain TEXT NOT NULL,
    tier INTEGER NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0,
    successes INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (domain, tier)
);
"#;

/// Initializes the key-value schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_kv_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(KV_SCHEMA_SQL)
}

/// Initializes the history schema
pub fn initialize_history_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(HISTORY_SCHEMA_SQL)
}
