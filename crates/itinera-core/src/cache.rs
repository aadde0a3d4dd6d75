use crate::error::CacheError;
use async_trait::async_trait;
use std::time::Duration;

/// Type alias for cache results.
pub type Result<T> = std::result::Result<T, CacheError>;

/// A string key-value store with per-entry expiry.
///
/// This is the raw substrate behind the cache client. Implementations can be
/// Redis, an in-process map, or anything else able to honor TTLs and glob
/// style pattern deletes. Values are opaque strings; typing happens one
/// layer up.
#[async_trait]
pub trait KvCache: Send + Sync + 'static {
    /// Reads a value. Returns `Ok(None)` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value that expires after `ttl`, replacing any previous value.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Removes every key matching the glob `pattern` and returns how many
    /// were removed. Matching nothing is not an error.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64>;

    /// Succeeds when the backend is currently able to serve requests.
    async fn ping(&self) -> Result<()>;
}

/// Result of a cache operation as seen by callers.
///
/// Cache failures never propagate as errors. They collapse into `Degraded`,
/// which callers treat as "no help from the cache this time". A genuine miss
/// is `Ok(None)`, so the two stay distinguishable.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome<T> {
    Ok(T),
    Degraded,
}

impl<T> CacheOutcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, CacheOutcome::Degraded)
    }

    pub fn ok(self) -> Option<T> {
        match self {
            CacheOutcome::Ok(value) => Some(value),
            CacheOutcome::Degraded => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheOutcome<U> {
        match self {
            CacheOutcome::Ok(value) => CacheOutcome::Ok(f(value)),
            CacheOutcome::Degraded => CacheOutcome::Degraded,
        }
    }
}
