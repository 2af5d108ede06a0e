//! Per-domain cookie cache
//!
//! Holds cookies needed to get through a domain's age gate or consent wall,
//! keyed by domain with an expiry. Writes replace the whole set.

use crate::store::{KvStore, StoreResult};
use crate::url::normalize_domain_key;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cookie name to value mapping for one domain
pub type CookieSet = BTreeMap<String, String>;

/// Default cookie lifetime
pub const DEFAULT_COOKIE_TTL: Duration = Duration::from_secs(86_400);

/// Domain-keyed cookie cache on the shared backing store
#[derive(Clone)]
pub struct DomainCookieCache {
    store: Arc<dyn KvStore>,
    prefix: String,
    default_ttl: Duration,
}

impl DomainCookieCache {
    /// Creates a cache whose entries live for `default_ttl` unless told otherwise
    pub fn new(store: Arc<dyn KvStore>, prefix: impl Into<String>, default_ttl: Duration) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            default_ttl,
        }
    }

    fn key(&self, domain: &str) -> String {
        format!("{}:cookies:{}", self.prefix, normalize_domain_key(domain))
    }

    /// Stores `cookies` for `domain`, replacing anything cached before
    pub fn set_domain_cookies(
        &self,
        domain: &str,
        cookies: &CookieSet,
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let value = serde_json::to_string(cookies)?;
        self.store.set_ex(&self.key(domain), &value, Some(ttl))?;

        debug!(domain, count = cookies.len(), ttl_secs = ttl.as_secs(), "Cached cookies");
        Ok(())
    }

    /// Cookies for `domain`, or `None` if absent or expired
    pub fn get_domain_cookies(&self, domain: &str) -> StoreResult<Option<CookieSet>> {
        match self.store.get(&self.key(domain))? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    /// Removes cookies for `domain` before they expire
    pub fn delete_domain_cookies(&self, domain: &str) -> StoreResult<bool> {
        self.store.del(&self.key(domain))
    }
}
