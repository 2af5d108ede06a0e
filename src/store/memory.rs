//! In-process store implementation
//!
//! `MemoryStore` provides the `KvStore` primitives for single-process
//! deployments and tests. All state lives behind one mutex, so every
//! operation is atomic with respect to other threads sharing the store.

use crate::store::traits::{KvStore, ScoredMember, StoreError, StoreResult};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct SortedSet {
    /// Ordered by (score, insertion sequence)
    order: BTreeMap<(i64, u64), String>,
    index: HashMap<String, (i64, u64)>,
}

#[derive(Debug)]
enum Value {
    Str(String),
    Set(HashSet<String>),
    Sorted(SortedSet),
}

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

impl Inner {
    /// Returns the live entry at `key`, dropping it first if it has expired
    fn live(&mut self, key: &str) -> Option<&mut Entry> {
        let now = Instant::now();
        if self.entries.get(key).is_some_and(|e| e.is_expired(now)) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn set_mut(&mut self, key: &str) -> StoreResult<&mut HashSet<String>> {
        if self.live(key).is_none() {
            self.entries
                .insert(key.to_string(), Entry::new(Value::Set(HashSet::new())));
        }
        match self.entries.get_mut(key).map(|e| &mut e.value) {
            Some(Value::Set(set)) => Ok(set),
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn sorted_mut(&mut self, key: &str) -> StoreResult<&mut SortedSet> {
        if self.live(key).is_none() {
            self.entries.insert(
                key.to_string(),
                Entry::new(Value::Sorted(SortedSet::default())),
            );
        }
        match self.entries.get_mut(key).map(|e| &mut e.value) {
            Some(Value::Sorted(zset)) => Ok(zset),
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }
}

/// Embedded `KvStore` for a single process
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl KvStore for MemoryStore {
    fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut inner = self.lock()?;
        let next = match inner.live(key) {
            None => 1,
            Some(Entry {
                value: Value::Str(current),
                ..
            }) => {
                current
                    .parse::<i64>()
                    .map_err(|_| StoreError::WrongType(key.to_string()))?
                    + 1
            }
            Some(_) => return Err(StoreError::WrongType(key.to_string())),
        };

        match inner.live(key) {
            Some(entry) => entry.value = Value::Str(next.to_string()),
            None => {
                inner
                    .entries
                    .insert(key.to_string(), Entry::new(Value::Str(next.to_string())));
            }
        }
        Ok(next)
    }

    fn sadd(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        Ok(inner.set_mut(key)?.insert(member.to_string()))
    }

    fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        match inner.live(key).map(|e| &e.value) {
            None => Ok(false),
            Some(Value::Set(set)) => Ok(set.contains(member)),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn scard(&self, key: &str) -> StoreResult<u64> {
        let mut inner = self.lock()?;
        match inner.live(key).map(|e| &e.value) {
            None => Ok(0),
            Some(Value::Set(set)) => Ok(set.len() as u64),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn zadd(&self, key: &str, score: i64, member: &str) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let zset = inner.sorted_mut(key)?;
        let newly_added = match zset.index.remove(member) {
            Some(old) => {
                zset.order.remove(&old);
                false
            }
            None => true,
        };
        zset.order.insert((score, seq), member.to_string());
        zset.index.insert(member.to_string(), (score, seq));
        Ok(newly_added)
    }

    fn zpopmin(&self, key: &str) -> StoreResult<Option<ScoredMember>> {
        let mut inner = self.lock()?;
        let popped = match inner.live(key).map(|e| &mut e.value) {
            None => return Ok(None),
            Some(Value::Sorted(zset)) => zset.order.pop_first().map(|((score, _), member)| {
                zset.index.remove(&member);
                ScoredMember { member, score }
            }),
            Some(_) => return Err(StoreError::WrongType(key.to_string())),
        };
        Ok(popped)
    }

    fn zpeekmin(&self, key: &str) -> StoreResult<Option<ScoredMember>> {
        let mut inner = self.lock()?;
        match inner.live(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Sorted(zset)) => Ok(zset
                .order
                .first_key_value()
                .map(|((score, _), member)| ScoredMember {
                    member: member.clone(),
                    score: *score,
                })),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn zcard(&self, key: &str) -> StoreResult<u64> {
        let mut inner = self.lock()?;
        match inner.live(key).map(|e| &e.value) {
            None => Ok(0),
            Some(Value::Sorted(zset)) => Ok(zset.order.len() as u64),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn set_ex(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut inner = self.lock()?;
        match inner.live(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Str(value)) => Ok(Some(value.clone())),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        match inner.live(key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn del(&self, key: &str) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        let existed = inner.live(key).is_some();
        inner.entries.remove(key);
        Ok(existed)
    }
}
