//! Priority frontier
//!
//! Each queue is a sorted set of JSON-encoded [`QueueEntry`] members scored
//! by `10 - priority`. Admission is gated by the [`SeenUrlStore`]; popping is
//! a single atomic remove-and-return on the backing store.

use crate::frontier::entry::{AddOptions, QueueEntry};
use crate::frontier::seen::SeenUrlStore;
use crate::store::{KvStore, StoreResult};
use crate::url::url_hash;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Snapshot of one queue's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Entries currently queued
    pub size: u64,

    /// Hashes in the queue's seen set
    pub seen: u64,

    /// Entries admitted since the last reset
    pub added: u64,

    /// Entries popped since the last reset
    pub popped: u64,
}

/// Per-queue admission-controlled priority queue
#[derive(Clone)]
pub struct Frontier {
    store: Arc<dyn KvStore>,
    seen: SeenUrlStore,
    prefix: String,
}

impl Frontier {
    /// Creates a frontier over `store`, deduplicating through `seen`
    pub fn new(store: Arc<dyn KvStore>, seen: SeenUrlStore, prefix: impl Into<String>) -> Self {
        Self {
            store,
            seen,
            prefix: prefix.into(),
        }
    }

    /// The seen store used for admission checks
    pub fn seen(&self) -> &SeenUrlStore {
        &self.seen
    }

    fn queue_key(&self, queue_id: &str) -> String {
        format!("{}:queue:{}", self.prefix, queue_id)
    }

    fn stats_key(&self, queue_id: &str, counter: &str) -> String {
        format!("{}:stats:{}:{}", self.prefix, queue_id, counter)
    }

    // ===== Admission =====

    /// Admits `url` into the queue unless it has been seen before
    ///
    /// Returns `false` for duplicates. The per-queue seen-set insert is the
    /// admission gate, so concurrent callers admit a URL at most once. On
    /// admission the URL is marked seen in both the queue and global scopes.
    pub fn add_url(&self, queue_id: &str, url: &str, options: AddOptions) -> StoreResult<bool> {
        if self.seen.is_seen(queue_id, url)? {
            debug!(queue = %queue_id, url = %url, "Skipping already seen URL");
            return Ok(false);
        }

        if !self.seen.claim(queue_id, url)? {
            debug!(queue = %queue_id, url = %url, "Lost admission race for URL");
            return Ok(false);
        }

        let entry = QueueEntry {
            url: url.to_string(),
            url_hash: url_hash(url),
            source_id: options.source_id,
            added_at: Utc::now(),
            metadata: options.metadata,
            priority: options.priority,
        };
        let member = serde_json::to_string(&entry)?;

        self.store
            .zadd(&self.queue_key(queue_id), entry.score(), &member)?;
        self.store.incr(&self.stats_key(queue_id, "added"))?;

        debug!(
            queue = %queue_id,
            url = %url,
            priority = entry.priority,
            "Admitted URL"
        );
        Ok(true)
    }

    /// Admits each URL in turn, returning how many were new
    pub fn add_urls<I, S>(
        &self,
        queue_id: &str,
        urls: I,
        priority: i32,
        source_id: Option<&str>,
    ) -> StoreResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for url in urls {
            let options = AddOptions {
                priority,
                source_id: source_id.map(str::to_string),
                ..AddOptions::default()
            };
            if self.add_url(queue_id, url.as_ref(), options)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Marks `url` seen without queueing it
    pub fn mark_url_seen(&self, queue_id: &str, url: &str) -> StoreResult<()> {
        self.seen.mark_seen(queue_id, url)
    }

    // ===== Retrieval =====

    /// Removes and returns the most urgent entry
    ///
    /// Equal priorities come out in admission order.
    pub fn get_next_url(&self, queue_id: &str) -> StoreResult<Option<QueueEntry>> {
        let key = self.queue_key(queue_id);
        loop {
            let Some(popped) = self.store.zpopmin(&key)? else {
                return Ok(None);
            };

            match serde_json::from_str::<QueueEntry>(&popped.member) {
                Ok(entry) => {
                    self.store.incr(&self.stats_key(queue_id, "popped"))?;
                    debug!(queue = %queue_id, url = %entry.url, "Popped URL");
                    return Ok(Some(entry));
                }
                Err(e) => {
                    warn!(queue = %queue_id, error = %e, "Dropping undecodable queue entry");
                }
            }
        }
    }

    /// Returns the entry [`get_next_url`](Self::get_next_url) would pop,
    /// without removing it
    pub fn peek_next_url(&self, queue_id: &str) -> StoreResult<Option<QueueEntry>> {
        match self.store.zpeekmin(&self.queue_key(queue_id))? {
            Some(head) => Ok(Some(serde_json::from_str(&head.member)?)),
            None => Ok(None),
        }
    }

    /// Number of queued entries
    pub fn get_queue_size(&self, queue_id: &str) -> StoreResult<u64> {
        self.store.zcard(&self.queue_key(queue_id))
    }

    /// Returns true if nothing is queued
    pub fn is_empty(&self, queue_id: &str) -> StoreResult<bool> {
        Ok(self.get_queue_size(queue_id)? == 0)
    }

    // ===== Administration =====

    /// Drops every queued entry
    pub fn clear_queue(&self, queue_id: &str) -> StoreResult<()> {
        self.store.del(&self.queue_key(queue_id))?;
        Ok(())
    }

    /// Drops the queue's seen set
    pub fn clear_seen(&self, queue_id: &str) -> StoreResult<()> {
        self.seen.clear_seen(queue_id)
    }

    /// Clears the queue, its seen set and its counters
    pub fn reset_queue(&self, queue_id: &str) -> StoreResult<()> {
        self.clear_queue(queue_id)?;
        self.clear_seen(queue_id)?;
        self.store.del(&self.stats_key(queue_id, "added"))?;
        self.store.del(&self.stats_key(queue_id, "popped"))?;
        Ok(())
    }

    /// Current size, seen count and admission/pop counters
    pub fn get_queue_stats(&self, queue_id: &str) -> StoreResult<QueueStats> {
        Ok(QueueStats {
            size: self.get_queue_size(queue_id)?,
            seen: self.seen.get_seen_count(queue_id)?,
            added: self.read_counter(&self.stats_key(queue_id, "added"))?,
            popped: self.read_counter(&self.stats_key(queue_id, "popped"))?,
        })
    }

    fn read_counter(&self, key: &str) -> StoreResult<u64> {
        Ok(self
            .store
            .get(key)?
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(0))
    }
}
