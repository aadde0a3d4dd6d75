use itinera_core::{CacheError, CacheOutcome, KvCache};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Upper bound on a single cache round trip before it counts as degraded.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(500);

/// The cache handle shared by every component that touches the cache.
///
/// Values are stored as JSON. No operation ever returns an error: backend
/// failures, timeouts and unavailability are logged and reported as
/// [`CacheOutcome::Degraded`], while a value that no longer deserializes is
/// logged and reported as a miss.
#[derive(Clone)]
pub struct CacheClient {
    backend: Arc<dyn KvCache>,
    operation_timeout: Duration,
}

impl CacheClient {
    pub fn new(backend: impl KvCache) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<dyn KvCache>) -> Self {
        Self {
            backend,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, operation_timeout: Duration) -> Self {
        self.operation_timeout = operation_timeout;
        self
    }

    /// Reads and decodes a value.
    ///
    /// * `Ok(Some(v))` - hit
    /// * `Ok(None)` - miss, expired, or undecodable value
    /// * `Degraded` - the backend could not answer
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> CacheOutcome<Option<T>> {
        trace!(key, "cache lookup");
        let raw = match self.bounded("get", key, self.backend.get(key)).await {
            CacheOutcome::Ok(raw) => raw,
            CacheOutcome::Degraded => return CacheOutcome::Degraded,
        };

        let Some(raw) = raw else {
            debug!(key, "cache miss");
            return CacheOutcome::Ok(None);
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => {
                debug!(key, "cache hit");
                CacheOutcome::Ok(Some(value))
            }
            Err(e) => {
                warn!(key, error = %e, "discarding undecodable cache value");
                CacheOutcome::Ok(None)
            }
        }
    }

    /// Encodes and stores a value with the given time to live.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> CacheOutcome<()> {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                let err = CacheError::Serialization(e.to_string());
                warn!(key, error = %err, "failed to encode cache value");
                return CacheOutcome::Degraded;
            }
        };

        trace!(key, ttl_secs = ttl.as_secs(), "cache write");
        self.bounded("set", key, self.backend.set(key, json, ttl))
            .await
    }

    /// Removes every key matching `pattern`, returning the number removed.
    pub async fn delete_by_pattern(&self, pattern: &str) -> CacheOutcome<u64> {
        trace!(pattern, "cache pattern delete");
        self.bounded("delete_by_pattern", pattern, self.backend.delete_pattern(pattern))
            .await
    }

    /// Whether the backend currently answers. Never fails.
    pub async fn is_available(&self) -> bool {
        !self
            .bounded("ping", "", self.backend.ping())
            .await
            .is_degraded()
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        key: &str,
        fut: impl Future<Output = Result<T, CacheError>>,
    ) -> CacheOutcome<T> {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(Ok(value)) => CacheOutcome::Ok(value),
            Ok(Err(e)) => {
                warn!(operation, key, error = %e, "cache operation failed");
                CacheOutcome::Degraded
            }
            Err(_) => {
                let err = CacheError::Timeout(format!(
                    "{operation} exceeded {}ms",
                    self.operation_timeout.as_millis()
                ));
                warn!(operation, key, error = %err, "cache operation timed out");
                CacheOutcome::Degraded
            }
        }
    }
}

impl std::fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient")
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}
