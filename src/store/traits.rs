//! Store traits and error types
//!
//! This module defines the primitive operations the frontier, the seen-URL
//! store and the cookie cache need from a shared key-value/sorted-set backend.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Wrong value type at key {0}")]
    WrongType(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A member popped or peeked from a sorted set
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    pub member: String,
    pub score: i64,
}

/// Trait for key-value/sorted-set backends
///
/// Every method is a single atomic operation from the point of view of other
/// callers sharing the same backend. Implementations must be safe to share
/// between worker threads.
///
/// Sorted-set members with equal scores are ordered by insertion (first added
/// is popped first).
pub trait KvStore: Send + Sync {
    // ===== Counters =====

    /// Atomically increments the integer at `key` and returns the new value
    fn incr(&self, key: &str) -> StoreResult<i64>;

    // ===== Sets =====

    /// Adds `member` to the set at `key`
    ///
    /// Returns `true` if the member was not present before.
    fn sadd(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// Tests whether `member` is in the set at `key`
    fn sismember(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// Returns the number of members in the set at `key`
    fn scard(&self, key: &str) -> StoreResult<u64>;

    // ===== Sorted Sets =====

    /// Adds `member` with `score` to the sorted set at `key`
    ///
    /// Re-adding an existing member updates its score. Returns `true` if the
    /// member was newly added.
    fn zadd(&self, key: &str, score: i64, member: &str) -> StoreResult<bool>;

    /// Removes and returns the lowest-scored member
    fn zpopmin(&self, key: &str) -> StoreResult<Option<ScoredMember>>;

    /// Returns the lowest-scored member without removing it
    fn zpeekmin(&self, key: &str) -> StoreResult<Option<ScoredMember>>;

    /// Returns the number of members in the sorted set at `key`
    fn zcard(&self, key: &str) -> StoreResult<u64>;

    // ===== Strings =====

    /// Stores a string value, optionally expiring after `ttl`
    fn set_ex(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Gets a string value, or `None` if absent or expired
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    // ===== Keys =====

    /// Sets an expiry on an existing key
    ///
    /// Returns `false` if the key does not exist.
    fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Deletes a key of any type
    ///
    /// Returns `true` if something was removed.
    fn del(&self, key: &str) -> StoreResult<bool>;
}
