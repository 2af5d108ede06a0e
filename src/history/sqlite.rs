//! SQLite crawl history implementation
//!
//! Durable record of crawled URLs, URLs that yielded a product, and per-domain
//! fetch statistics.

use crate::escalation::FetchTier;
use crate::history::traits::HistoryLookup;
use crate::state::{DomainStats, TierCounter};
use crate::store::schema::initialize_history_schema;
use crate::store::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Summary counts for the `stats` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryCounts {
    pub crawled_urls: u64,
    pub discovered_items: u64,
    pub domains: u64,
}

/// SQLite history backend
pub struct SqliteHistory {
    conn: Mutex<Connection>,
}

impl SqliteHistory {
    /// Opens (or creates) a history database at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        initialize_history_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory history database
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_history_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("history lock poisoned".to_string()))
    }

    /// Records a successfully crawled URL
    ///
    /// Re-crawling an already recorded URL refreshes its status and tier.
    pub fn record_crawled(&self, url: &str, status_code: u16, tier: FetchTier) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.lock()?.execute(
            "INSERT INTO crawled_urls (url, status_code, tier, crawled_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(url) DO UPDATE SET status_code = excluded.status_code,
                 tier = excluded.tier, crawled_at = excluded.crawled_at",
            params![url, status_code, tier.number(), now],
        )?;
        Ok(())
    }

    /// Records a URL that produced a discovered product
    pub fn record_discovered_item(&self, url: &str) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.lock()?.execute(
            "INSERT OR IGNORE INTO discovered_items (url, discovered_at) VALUES (?1, ?2)",
            params![url, now],
        )?;
        Ok(())
    }

    // ===== Domain Statistics =====

    /// Records one fetch attempt for a domain at `tier`
    pub fn record_fetch_attempt(
        &self,
        domain: &str,
        tier: FetchTier,
        success: bool,
    ) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let success = i64::from(success);
        self.lock()?.execute(
            "INSERT INTO domain_stats (domain, tier, attempts, successes, updated_at)
             VALUES (?1, ?2, 1, ?3, ?4)
             ON CONFLICT(domain, tier) DO UPDATE SET
                 attempts = attempts + 1,
                 successes = successes + excluded.successes,
                 updated_at = excluded.updated_at",
            params![domain, tier.number(), success, now],
        )?;
        Ok(())
    }

    /// Loads the statistics for a domain; unknown domains have empty stats
    pub fn load_domain_stats(&self, domain: &str) -> StoreResult<DomainStats> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT tier, attempts, successes, updated_at FROM domain_stats WHERE domain = ?1",
        )?;

        let rows = stmt.query_map(params![domain], |row| {
            Ok((
                row.get::<_, u8>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut stats = DomainStats::new();
        for row in rows {
            let (tier_number, attempts, successes, updated_at) = row?;
            let Some(tier) = FetchTier::from_number(tier_number) else {
                tracing::warn!(domain, tier = tier_number, "Ignoring stats for unknown tier");
                continue;
            };

            stats.tiers[usize::from(tier.number() - 1)] = TierCounter {
                attempts: attempts.max(0) as u64,
                successes: successes.max(0) as u64,
            };

            if let Ok(updated_at) = updated_at.parse::<DateTime<Utc>>() {
                stats.updated_at = stats.updated_at.max(Some(updated_at));
            }
        }

        Ok(stats)
    }

    // ===== Statistics =====

    /// Counts rows in each history table
    pub fn counts(&self) -> StoreResult<HistoryCounts> {
        let conn = self.lock()?;
        let count = |sql: &str| -> StoreResult<u64> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as u64)
        };

        Ok(HistoryCounts {
            crawled_urls: count("SELECT COUNT(*) FROM crawled_urls")?,
            discovered_items: count("SELECT COUNT(*) FROM discovered_items")?,
            domains: count("SELECT COUNT(DISTINCT domain) FROM domain_stats")?,
        })
    }

    fn exists_in(&self, table: &str, url: &str, normalized: &str) -> StoreResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE url = ?1 OR url = ?2)",
            table
        );
        let exists: bool = self
            .lock()?
            .query_row(&sql, params![url, normalized], |row| row.get(0))?;
        Ok(exists)
    }
}

impl HistoryLookup for SqliteHistory {
    fn was_crawled(&self, url: &str, normalized: &str) -> StoreResult<bool> {
        self.exists_in("crawled_urls", url, normalized)
    }

    fn has_discovered_item(&self, url: &str, normalized: &str) -> StoreResult<bool> {
        self.exists_in("discovered_items", url, normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::normalize_for_dedup;

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteHistory::open_in_memory().is_ok());
    }

    #[test]
    fn test_was_crawled_exact_match() {
        let history = SqliteHistory::open_in_memory().unwrap();
        history
            .record_crawled("https://shop.com/Whisky/12", 200, FetchTier::Http)
            .unwrap();

        let url = "https://shop.com/Whisky/12";
        assert!(history.was_crawled(url, &normalize_for_dedup(url)).unwrap());
        let other = "https://shop.com/whisky/18";
        assert!(!history.was_crawled(other, &normalize_for_dedup(other)).unwrap());
    }

    #[test]
    fn test_was_crawled_normalized_match() {
        let history = SqliteHistory::open_in_memory().unwrap();
        history
            .record_crawled("https://shop.com/whisky/12", 200, FetchTier::Http)
            .unwrap();

        let variant = "HTTPS://Shop.com/Whisky/12/";
        assert!(history
            .was_crawled(variant, &normalize_for_dedup(variant))
            .unwrap());
    }

    #[test]
    fn test_stored_mixed_case_needs_exact_match() {
        let history = SqliteHistory::open_in_memory().unwrap();
        history
            .record_crawled("https://shop.com/Whisky/12", 200, FetchTier::Http)
            .unwrap();

        let variant = "https://shop.com/WHISKY/12";
        assert!(!history
            .was_crawled(variant, &normalize_for_dedup(variant))
            .unwrap());
    }

    #[test]
    fn test_record_crawled_twice_updates() {
        let history = SqliteHistory::open_in_memory().unwrap();
        history
            .record_crawled("https://shop.com/a", 200, FetchTier::Http)
            .unwrap();
        history
            .record_crawled("https://shop.com/a", 200, FetchTier::Browser)
            .unwrap();
        assert_eq!(history.counts().unwrap().crawled_urls, 1);
    }

    #[test]
    fn test_discovered_items() {
        let history = SqliteHistory::open_in_memory().unwrap();
        history
            .record_discovered_item("https://reviews.com/bottle/7")
            .unwrap();
        history
            .record_discovered_item("https://reviews.com/bottle/7")
            .unwrap();

        let url = "https://reviews.com/bottle/7";
        assert!(history
            .has_discovered_item(url, &normalize_for_dedup(url))
            .unwrap());
        assert!(!history.was_crawled(url, &normalize_for_dedup(url)).unwrap());
        assert_eq!(history.counts().unwrap().discovered_items, 1);
    }

    #[test]
    fn test_domain_stats_roundtrip() {
        let history = SqliteHistory::open_in_memory().unwrap();
        history
            .record_fetch_attempt("shop.com", FetchTier::Http, true)
            .unwrap();
        history
            .record_fetch_attempt("shop.com", FetchTier::Http, false)
            .unwrap();
        history
            .record_fetch_attempt("shop.com", FetchTier::Browser, true)
            .unwrap();
        history
            .record_fetch_attempt("other.com", FetchTier::Http, false)
            .unwrap();

        let stats = history.load_domain_stats("shop.com").unwrap();
        assert_eq!(
            stats.counter(FetchTier::Http),
            TierCounter {
                attempts: 2,
                successes: 1
            }
        );
        assert_eq!(stats.counter(FetchTier::Browser).attempts, 1);
        assert_eq!(stats.counter(FetchTier::CloudBrowser).attempts, 0);
        assert!(stats.updated_at.is_some());
        assert_eq!(history.counts().unwrap().domains, 2);
    }

    #[test]
    fn test_unknown_domain_has_empty_stats() {
        let history = SqliteHistory::open_in_memory().unwrap();
        let stats = history.load_domain_stats("never-seen.com").unwrap();
        assert_eq!(stats, DomainStats::new());
    }
}
