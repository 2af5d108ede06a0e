use crate::store::StoreResult;

/// Read-only view of durable crawl history
///
/// Both predicates compare against stored URL strings by exact equality.
/// Callers pass the raw URL and its normalized form; a match on either one
/// counts.
pub trait HistoryLookup: Send + Sync {
    /// Has this URL been fully crawled before?
    fn was_crawled(&self, url: &str, normalized: &str) -> StoreResult<bool>;

    /// Has this URL already produced a discovered product?
    fn has_discovered_item(&self, url: &str, normalized: &str) -> StoreResult<bool>;
}
