//! SQLite store implementation
//!
//! This module provides a SQLite-based implementation of the `KvStore` trait.
//! The database file may be shared by several worker processes on one host:
//! every primitive runs inside an immediate transaction, and the sorted-set
//! pop is a single `DELETE ... RETURNING` statement.

use crate::store::schema::initialize_kv_schema;
use crate::store::traits::{KvStore, ScoredMember, StoreError, StoreResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// SQLite-backed `KvStore`
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a store database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StoreError)` - Failed to open database
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        initialize_kv_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory store
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_kv_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs `f` inside an immediate transaction after dropping `key` if expired
    fn with_key<T>(
        &self,
        key: &str,
        f: impl FnOnce(&Transaction<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite store lock poisoned".to_string()))?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        purge_if_expired(&tx, key)?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

fn purge_if_expired(conn: &Connection, key: &str) -> StoreResult<()> {
    let expired: Option<i64> = conn
        .query_row(
            "SELECT expires_at FROM kv_expiry WHERE key = ?1 AND expires_at <= ?2",
            params![key, now_millis()],
            |row| row.get(0),
        )
        .optional()?;

    if expired.is_some() {
        delete_key(conn, key)?;
    }
    Ok(())
}

fn delete_key(conn: &Connection, key: &str) -> StoreResult<bool> {
    let mut removed = 0;
    removed += conn.execute("DELETE FROM kv_strings WHERE key = ?1", params![key])?;
    removed += conn.execute("DELETE FROM kv_sets WHERE key = ?1", params![key])?;
    removed += conn.execute("DELETE FROM kv_zsets WHERE key = ?1", params![key])?;
    conn.execute("DELETE FROM kv_expiry WHERE key = ?1", params![key])?;
    Ok(removed > 0)
}

fn key_exists(conn: &Connection, key: &str) -> StoreResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM kv_strings WHERE key = ?1)
             OR EXISTS(SELECT 1 FROM kv_sets WHERE key = ?1)
             OR EXISTS(SELECT 1 FROM kv_zsets WHERE key = ?1)",
        params![key],
        |row| row.get(0),
    )?;
    Ok(exists)
}

impl KvStore for SqliteStore {
    fn incr(&self, key: &str) -> StoreResult<i64> {
        self.with_key(key, |tx| {
            let current: Option<String> = tx
                .query_row(
                    "SELECT value FROM kv_strings WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;

            let next = match current {
                Some(value) => {
                    value
                        .parse::<i64>()
                        .map_err(|_| StoreError::WrongType(key.to_string()))?
                        + 1
                }
                None => 1,
            };

            tx.execute(
                "INSERT OR REPLACE INTO kv_strings (key, value) VALUES (?1, ?2)",
                params![key, next.to_string()],
            )?;
            Ok(next)
        })
    }

    fn sadd(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.with_key(key, |tx| {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO kv_sets (key, member) VALUES (?1, ?2)",
                params![key, member],
            )?;
            Ok(inserted == 1)
        })
    }

    fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.with_key(key, |tx| {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM kv_sets WHERE key = ?1 AND member = ?2)",
                params![key, member],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    fn scard(&self, key: &str) -> StoreResult<u64> {
        self.with_key(key, |tx| {
            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM kv_sets WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    fn zadd(&self, key: &str, score: i64, member: &str) -> StoreResult<bool> {
        self.with_key(key, |tx| {
            let replaced = tx.execute(
                "DELETE FROM kv_zsets WHERE key = ?1 AND member = ?2",
                params![key, member],
            )?;
            tx.execute(
                "INSERT INTO kv_zsets (key, member, score) VALUES (?1, ?2, ?3)",
                params![key, member, score],
            )?;
            Ok(replaced == 0)
        })
    }

    fn zpopmin(&self, key: &str) -> StoreResult<Option<ScoredMember>> {
        self.with_key(key, |tx| {
            let popped = tx
                .query_row(
                    "DELETE FROM kv_zsets WHERE seq = (
                         SELECT seq FROM kv_zsets WHERE key = ?1
                         ORDER BY score ASC, seq ASC LIMIT 1
                     )
                     RETURNING member, score",
                    params![key],
                    |row| {
                        Ok(ScoredMember {
                            member: row.get(0)?,
                            score: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(popped)
        })
    }

    fn zpeekmin(&self, key: &str) -> StoreResult<Option<ScoredMember>> {
        self.with_key(key, |tx| {
            let head = tx
                .query_row(
                    "SELECT member, score FROM kv_zsets WHERE key = ?1
                     ORDER BY score ASC, seq ASC LIMIT 1",
                    params![key],
                    |row| {
                        Ok(ScoredMember {
                            member: row.get(0)?,
                            score: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(head)
        })
    }

    fn zcard(&self, key: &str) -> StoreResult<u64> {
        self.with_key(key, |tx| {
            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM kv_zsets WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    fn set_ex(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        self.with_key(key, |tx| {
            // A string write replaces whatever the key held, including its TTL
            delete_key(tx, key)?;
            tx.execute(
                "INSERT INTO kv_strings (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
            if let Some(ttl) = ttl {
                tx.execute(
                    "INSERT INTO kv_expiry (key, expires_at) VALUES (?1, ?2)",
                    params![key, now_millis().saturating_add(ttl_millis(ttl))],
                )?;
            }
            Ok(())
        })
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.with_key(key, |tx| {
            let value = tx
                .query_row(
                    "SELECT value FROM kv_strings WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.with_key(key, |tx| {
            if !key_exists(tx, key)? {
                return Ok(false);
            }
            tx.execute(
                "INSERT OR REPLACE INTO kv_expiry (key, expires_at) VALUES (?1, ?2)",
                params![key, now_millis().saturating_add(ttl_millis(ttl))],
            )?;
            Ok(true)
        })
    }

    fn del(&self, key: &str) -> StoreResult<bool> {
        self.with_key(key, |tx| delete_key(tx, key))
    }
}
