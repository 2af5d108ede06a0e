use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default priority for admitted URLs
pub const DEFAULT_PRIORITY: i32 = 5;

/// Highest priority in the supported range; priority 10 maps to score 0
pub const MAX_PRIORITY: i32 = 10;

/// One pending crawl task
///
/// Entries are stored as JSON members of the queue's sorted set and are never
/// mutated while queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// The URL as it was submitted
    pub url: String,

    /// Hex SHA-256 of the normalized URL
    pub url_hash: String,

    /// Crawl source that produced this URL, if any
    pub source_id: Option<String>,

    /// When the entry was admitted
    pub added_at: DateTime<Utc>,

    /// Caller-supplied key-value data carried through the queue
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// 1 to 10, higher is more urgent
    pub priority: i32,
}

impl QueueEntry {
    /// Sorted-set score for this entry; lower scores are dequeued first
    pub fn score(&self) -> i64 {
        priority_score(self.priority)
    }
}

/// Maps a priority to its queue score (`10 - priority`)
pub fn priority_score(priority: i32) -> i64 {
    i64::from(MAX_PRIORITY) - i64::from(priority)
}

/// Options for [`Frontier::add_url`](super::Frontier::add_url)
#[derive(Debug, Clone, PartialEq)]
pub struct AddOptions {
    pub priority: i32,
    pub source_id: Option<String>,
    pub metadata: Map<String, Value>,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            source_id: None,
            metadata: Map::new(),
        }
    }
}

impl AddOptions {
    /// Default options with the given priority
    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    /// Sets the originating source
    pub fn source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Adds one metadata field
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
