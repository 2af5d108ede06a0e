//! Two-tier seen-URL store
//!
//! Membership is tested against fast per-queue and global sets first, then
//! against durable crawl history. Durable hits are written back into the fast
//! sets so a wiped store refills itself as URLs come around again.

use crate::history::HistoryLookup;
use crate::store::{KvStore, StoreResult};
use crate::url::{normalize_for_dedup, url_hash};
use std::sync::Arc;
use tracing::{debug, warn};

/// Deduplication record shared by every worker on the same backing store
#[derive(Clone)]
pub struct SeenUrlStore {
    store: Arc<dyn KvStore>,
    history: Arc<dyn HistoryLookup>,
    prefix: String,
}

impl SeenUrlStore {
    /// Creates a seen store using `prefix` for its keys
    pub fn new(
        store: Arc<dyn KvStore>,
        history: Arc<dyn HistoryLookup>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            history,
            prefix: prefix.into(),
        }
    }

    fn queue_key(&self, queue_id: &str) -> String {
        format!("{}:seen:{}", self.prefix, queue_id)
    }

    fn global_key(&self) -> String {
        format!("{}:seen:global", self.prefix)
    }

    /// Returns true if `url` was already seen by this queue, by any queue, or
    /// by durable crawl history
    ///
    /// Fast-store failures are returned to the caller. History failures are
    /// logged and treated as "not seen".
    pub fn is_seen(&self, queue_id: &str, url: &str) -> StoreResult<bool> {
        let hash = url_hash(url);

        if self.store.sismember(&self.queue_key(queue_id), &hash)? {
            return Ok(true);
        }
        if self.store.sismember(&self.global_key(), &hash)? {
            return Ok(true);
        }

        let normalized = normalize_for_dedup(url);

        if self.durable_check("crawled", || self.history.was_crawled(url, &normalized)) {
            debug!(queue = %queue_id, url = %url, "Seen in crawl history");
            self.mark_hash(queue_id, &hash)?;
            return Ok(true);
        }

        if self.durable_check("discovered", || {
            self.history.has_discovered_item(url, &normalized)
        }) {
            debug!(queue = %queue_id, url = %url, "Seen in discovered items");
            self.mark_hash(queue_id, &hash)?;
            return Ok(true);
        }

        Ok(false)
    }

    fn durable_check(&self, what: &str, check: impl FnOnce() -> StoreResult<bool>) -> bool {
        match check() {
            Ok(found) => found,
            Err(e) => {
                warn!(check = what, error = %e, "Durable history lookup failed, treating as not seen");
                false
            }
        }
    }

    /// Adds `url` to the per-queue and global sets without touching history
    pub fn mark_seen(&self, queue_id: &str, url: &str) -> StoreResult<()> {
        self.mark_hash(queue_id, &url_hash(url))
    }

    /// Atomically claims `url` for admission into the queue
    ///
    /// Returns `true` only for the caller whose insert into the per-queue set
    /// added the hash; concurrent callers racing on the same URL get `false`.
    /// The winner also records the hash in the global set.
    pub fn claim(&self, queue_id: &str, url: &str) -> StoreResult<bool> {
        let hash = url_hash(url);
        if !self.store.sadd(&self.queue_key(queue_id), &hash)? {
            return Ok(false);
        }
        self.store.sadd(&self.global_key(), &hash)?;
        Ok(true)
    }

    fn mark_hash(&self, queue_id: &str, hash: &str) -> StoreResult<()> {
        self.store.sadd(&self.queue_key(queue_id), hash)?;
        self.store.sadd(&self.global_key(), hash)?;
        Ok(())
    }

    /// Number of hashes in the queue's fast set
    pub fn get_seen_count(&self, queue_id: &str) -> StoreResult<u64> {
        self.store.scard(&self.queue_key(queue_id))
    }

    /// Number of hashes in the global fast set
    pub fn get_global_seen_count(&self) -> StoreResult<u64> {
        self.store.scard(&self.global_key())
    }

    /// Drops the queue's fast set; the global set is left alone
    pub fn clear_seen(&self, queue_id: &str) -> StoreResult<()> {
        self.store.del(&self.queue_key(queue_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::SqliteHistory;
    use crate::store::MemoryStore;
    use crate::FetchTier;

    fn seen_store() -> (SeenUrlStore, Arc<SqliteHistory>) {
        let history = Arc::new(SqliteHistory::open_in_memory().unwrap());
        let seen = SeenUrlStore::new(Arc::new(MemoryStore::new()), history.clone(), "test");
        (seen, history)
    }

    #[test]
    fn test_unknown_url_is_not_seen() {
        let (seen, _) = seen_store();
        assert!(!seen.is_seen("q1", "https://shop.com/a").unwrap());
        assert_eq!(seen.get_seen_count("q1").unwrap(), 0);
    }

    #[test]
    fn test_mark_seen_covers_queue_and_global() {
        let (seen, _) = seen_store();
        seen.mark_seen("q1", "https://shop.com/a").unwrap();

        assert!(seen.is_seen("q1", "https://shop.com/a").unwrap());
        assert!(seen.is_seen("q2", "https://shop.com/a").unwrap());
        assert_eq!(seen.get_seen_count("q1").unwrap(), 1);
        assert_eq!(seen.get_seen_count("q2").unwrap(), 0);
        assert_eq!(seen.get_global_seen_count().unwrap(), 1);
    }

    #[test]
    fn test_normalized_variants_collapse() {
        let (seen, _) = seen_store();
        seen.mark_seen("q1", "HTTP://Example.com/Path/").unwrap();
        assert!(seen.is_seen("q1", "http://example.com/path").unwrap());
        assert!(seen.is_seen("q1", "  http://example.com/path/  ").unwrap());
    }

    #[test]
    fn test_history_hit_backfills() {
        let (seen, history) = seen_store();
        history
            .record_crawled("https://shop.com/old", 200, FetchTier::Http)
            .unwrap();

        assert!(seen.is_seen("q1", "https://shop.com/old").unwrap());
        assert_eq!(seen.get_seen_count("q1").unwrap(), 1);
        assert_eq!(seen.get_global_seen_count().unwrap(), 1);
    }

    #[test]
    fn test_claim_wins_once() {
        let (seen, _) = seen_store();
        assert!(seen.claim("q1", "https://shop.com/a").unwrap());
        assert!(!seen.claim("q1", "HTTPS://shop.com/a/").unwrap());
        assert!(seen.claim("q2", "https://shop.com/a").unwrap());
        assert_eq!(seen.get_global_seen_count().unwrap(), 1);
    }

    #[test]
    fn test_clear_seen_keeps_global() {
        let (seen, _) = seen_store();
        seen.mark_seen("q1", "https://shop.com/a").unwrap();
        seen.clear_seen("q1").unwrap();

        assert_eq!(seen.get_seen_count("q1").unwrap(), 0);
        assert!(seen.is_seen("q1", "https://shop.com/a").unwrap());
    }
}
