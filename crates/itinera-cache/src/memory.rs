use async_trait::async_trait;
use dashmap::DashMap;
use itinera_core::cache::Result;
use itinera_core::{CacheError, Clock, KvCache, SystemClock};
use jiff::{SignedDuration, Timestamp};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Timestamp,
}

impl Entry {
    fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

/// In-process implementation of [`KvCache`] backed by a `DashMap`.
///
/// Expiry is evaluated lazily against an injectable [`Clock`], so tests can
/// step over TTL boundaries without sleeping. The backend can also be
/// switched off with [`MemoryKvCache::set_available`] to exercise the
/// degraded paths of its callers.
#[derive(Clone)]
pub struct MemoryKvCache {
    entries: Arc<DashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
    available: Arc<AtomicBool>,
}

impl MemoryKvCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            clock,
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulates the backend going down (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .iter()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining time to live of a key, if it is present.
    pub fn ttl(&self, key: &str) -> Option<SignedDuration> {
        let now = self.clock.now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.expires_at.duration_since(now))
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable(
                "in-memory cache is marked unavailable".to_string(),
            ))
        }
    }
}

impl Default for MemoryKvCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryKvCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKvCache")
            .field("entries", &self.entries.len())
            .field("available", &self.available.load(Ordering::SeqCst))
            .finish()
    }
}

#[async_trait]
impl KvCache for MemoryKvCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.ensure_available()?;
        let now = self.clock.now();

        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };

        if entry.is_expired(now) {
            drop(entry);
            self.entries.remove_if(key, |_, e| e.is_expired(now));
            trace!(key, "expired entry evicted on read");
            return Ok(None);
        }

        Ok(Some(entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.ensure_available()?;

        let ttl = SignedDuration::try_from(ttl)
            .map_err(|e| CacheError::Operation(format!("invalid ttl: {e}")))?;
        let expires_at = self
            .clock
            .now()
            .checked_add(ttl)
            .map_err(|e| CacheError::Operation(format!("ttl out of range: {e}")))?;

        self.entries
            .insert(key.to_owned(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64> {
        self.ensure_available()?;

        let matcher = glob::Pattern::new(pattern)
            .map_err(|e| CacheError::InvalidData(format!("invalid key pattern '{pattern}': {e}")))?;
        let now = self.clock.now();

        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| matcher.matches(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in keys {
            if let Some((_, entry)) = self.entries.remove(&key) {
                if !entry.is_expired(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn ping(&self) -> Result<()> {
        self.ensure_available()
    }
}
