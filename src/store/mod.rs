//! Store module for the shared crawl state
//!
//! This module provides the key-value/sorted-set backend that the frontier,
//! the seen-URL store and the domain cookie cache are built on:
//! - The `KvStore` trait with counters, sets, sorted sets, strings and expiry
//! - `MemoryStore` for single-process deployments and tests
//! - `SqliteStore` for a durable store shared by several worker processes

mod memory;
pub(crate) mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{KvStore, ScoredMember, StoreError, StoreResult};

use crate::config::{StoreBackend, StoreConfig};
use std::path::Path;
use std::sync::Arc;

/// Opens the backing store selected in the configuration
///
/// # Arguments
///
/// * `config` - The store configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn KvStore>)` - A store ready to be shared between workers
/// * `Err(StoreError)` - Failed to open the database
pub fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn KvStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Sqlite => Ok(Arc::new(SqliteStore::open(Path::new(
            &config.database_path,
        ))?)),
    }
}
