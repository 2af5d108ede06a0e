//! Crawl frontier
//!
//! Pending URLs live in per-queue priority queues. Admission is deduplicated
//! against the two-tier [`SeenUrlStore`].

mod entry;
mod queue;
mod seen;

pub use entry::{priority_score, AddOptions, QueueEntry, DEFAULT_PRIORITY, MAX_PRIORITY};
pub use queue::{Frontier, QueueStats};
pub use seen::SeenUrlStore;
