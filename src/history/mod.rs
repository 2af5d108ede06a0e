//! Durable crawl history
//!
//! The seen-URL store falls back to this history when its fast sets miss,
//! which is what lets deduplication survive a wipe of the backing store.

mod sqlite;
mod traits;

pub use sqlite::{HistoryCounts, SqliteHistory};
pub use traits::HistoryLookup;
