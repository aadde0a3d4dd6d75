use async_trait::async_trait;
use itinera_core::cache::Result;
use itinera_core::{CacheError, KvCache};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, info, trace, warn};

const DEFAULT_SCAN_COUNT: usize = 100;
const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// A Redis-based implementation of [`KvCache`].
///
/// The connection is established lazily on first use and then shared
/// through a [`ConnectionManager`], which reconnects on its own after the
/// server drops. Starting the process while Redis is down is therefore
/// fine: operations fail (and callers degrade) until the server appears.
///
/// After a failed connect, operations fail immediately with
/// [`CacheError::Unavailable`] until the reconnect backoff has passed, so
/// requests do not pile up behind connection attempts while Redis is down.
pub struct RedisKvCache {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    backoff: ConnectBackoff,
    scan_count: usize,
}

/// Holds back new connection attempts for a while after one fails.
#[derive(Debug)]
struct ConnectBackoff {
    period: Duration,
    failed_at: Mutex<Option<Instant>>,
}

impl ConnectBackoff {
    fn new(period: Duration) -> Self {
        Self {
            period,
            failed_at: Mutex::new(None),
        }
    }

    fn check(&self, now: Instant) -> Result<()> {
        let failed_at = *self.failed_at.lock().unwrap_or_else(PoisonError::into_inner);
        match failed_at {
            Some(at) if now.saturating_duration_since(at) < self.period => {
                Err(CacheError::Unavailable(format!(
                    "Redis connect failed {}ms ago, next attempt after {}ms",
                    now.saturating_duration_since(at).as_millis(),
                    self.period.as_millis()
                )))
            }
            _ => Ok(()),
        }
    }

    fn record(&self, failed_at: Option<Instant>) {
        *self.failed_at.lock().unwrap_or_else(PoisonError::into_inner) = failed_at;
    }

    /// Starts an attempt. It counts as failed unless marked as connected,
    /// including when the caller gives up on it midway.
    fn attempt(&self, now: Instant) -> ConnectAttempt<'_> {
        let mut failed_at = self.failed_at.lock().unwrap_or_else(PoisonError::into_inner);
        // Other callers keep failing fast while a retry is in progress.
        if failed_at.is_some() {
            *failed_at = Some(now);
        }
        drop(failed_at);

        ConnectAttempt {
            backoff: self,
            succeeded: false,
        }
    }
}

struct ConnectAttempt<'a> {
    backoff: &'a ConnectBackoff,
    succeeded: bool,
}

impl ConnectAttempt<'_> {
    fn connected(mut self) {
        self.succeeded = true;
    }
}

impl Drop for ConnectAttempt<'_> {
    fn drop(&mut self) {
        if self.succeeded {
            self.backoff.record(None);
        } else {
            self.backoff.record(Some(Instant::now()));
        }
    }
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() || message.to_ascii_lowercase().contains("timed out") {
        CacheError::Timeout(message)
    } else if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

fn is_literal_key(pattern: &str) -> bool {
    !pattern.contains(['*', '?', '[', ']', '\\'])
}

impl RedisKvCache {
    /// Creates a cache for the given Redis URL without connecting.
    ///
    /// # Arguments
    ///
    /// * `url` - A Redis connection string (e.g., "redis://127.0.0.1:6379")
    pub fn open(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Initialization(format!("invalid Redis url: {e}")))?;
        Ok(Self::new(client))
    }

    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            conn: OnceCell::new(),
            backoff: ConnectBackoff::new(DEFAULT_RECONNECT_BACKOFF),
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }

    /// Overrides how long operations fail fast after a failed connect.
    pub fn with_reconnect_backoff(mut self, period: Duration) -> Self {
        self.backoff = ConnectBackoff::new(period);
        self
    }

    /// Overrides the `COUNT` hint used for each `SCAN` step of pattern deletes.
    pub fn with_scan_count(mut self, scan_count: usize) -> Self {
        self.scan_count = scan_count.max(1);
        self
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        if let Some(conn) = self.conn.get() {
            return Ok(conn.clone());
        }
        self.backoff.check(Instant::now())?;

        let conn = self
            .conn
            .get_or_try_init(|| async {
                // Callers queued behind an attempt that just failed stop here.
                self.backoff.check(Instant::now())?;
                let attempt = self.backoff.attempt(Instant::now());
                let conn = self
                    .client
                    .get_connection_manager()
                    .await
                    .map_err(|e| map_redis_error("failed to connect to Redis", e))?;
                attempt.connected();
                info!("connected to Redis");
                Ok::<_, CacheError>(conn)
            })
            .await?;
        Ok(conn.clone())
    }

    async fn scan_matching(
        &self,
        conn: &mut ConnectionManager,
        pattern: &str,
    ) -> Result<Vec<String>> {
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(self.scan_count)
                .query_async(conn)
                .await
                .map_err(|e| map_redis_error("failed to scan keys in Redis", e))?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }
}

impl std::fmt::Debug for RedisKvCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisKvCache")
            .field("scan_count", &self.scan_count)
            .field("connected", &self.conn.initialized())
            .field("reconnect_backoff", &self.backoff.period)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl KvCache for RedisKvCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        trace!(key, "fetching value from Redis");
        let mut conn = self.connection().await?;

        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(key, error = %e, "Redis error on get");
                Err(map_redis_error("failed to fetch value from Redis", e))
            }
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        trace!(key, ttl_secs = ttl.as_secs(), "storing value in Redis");
        let mut conn = self.connection().await?;

        // EX rejects zero; anything shorter than a second rounds up.
        let seconds = ttl.as_secs().max(1);
        match conn.set_ex::<_, _, ()>(key, value, seconds).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(key, error = %e, "failed to write value to Redis");
                Err(map_redis_error("failed to write value to Redis", e))
            }
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.connection().await?;

        let keys = if is_literal_key(pattern) {
            vec![pattern.to_string()]
        } else {
            self.scan_matching(&mut conn, pattern).await?
        };

        if keys.is_empty() {
            trace!(pattern, "no keys matched pattern");
            return Ok(0);
        }

        let removed: u64 = conn
            .del(&keys)
            .await
            .map_err(|e| map_redis_error("failed to delete keys from Redis", e))?;
        debug!(pattern, removed, "deleted keys from Redis");
        Ok(removed)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("Redis ping failed", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_keys_skip_scan() {
        assert!(is_literal_key("itinerary:abc123"));
        assert!(!is_literal_key("itinerary:*"));
        assert!(!is_literal_key("itinerary:a?c"));
        assert!(!is_literal_key("itinerary:[ab]"));
    }

    #[test]
    fn failed_connect_holds_back_attempts_for_the_period() {
        let backoff = ConnectBackoff::new(Duration::from_secs(1));
        let failed = Instant::now();
        assert!(backoff.check(failed).is_ok());

        backoff.record(Some(failed));

        assert!(matches!(
            backoff.check(failed + Duration::from_millis(999)),
            Err(CacheError::Unavailable(_))
        ));
        assert!(backoff.check(failed + Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn abandoned_attempt_counts_as_failed() {
        let backoff = ConnectBackoff::new(Duration::from_secs(60));

        drop(backoff.attempt(Instant::now()));
        assert!(backoff.check(Instant::now()).is_err());

        backoff.attempt(Instant::now()).connected();
        assert!(backoff.check(Instant::now()).is_ok());
    }

    #[test]
    fn retry_in_progress_keeps_others_failing_fast() {
        let backoff = ConnectBackoff::new(Duration::from_secs(1));
        let failed = Instant::now();
        backoff.record(Some(failed));

        let retry_at = failed + Duration::from_secs(2);
        assert!(backoff.check(retry_at).is_ok());
        let retry = backoff.attempt(retry_at);

        assert!(backoff.check(retry_at + Duration::from_millis(10)).is_err());
        retry.connected();
        assert!(backoff.check(retry_at).is_ok());
    }

    #[test]
    fn first_connect_does_not_hold_back_others() {
        let backoff = ConnectBackoff::new(Duration::from_secs(1));
        let now = Instant::now();

        let _first = backoff.attempt(now);

        assert!(backoff.check(now).is_ok());
    }

    #[tokio::test]
    async fn operations_fail_fast_while_backing_off() {
        // Nothing listens on the discard port, but no connect is attempted.
        let cache = RedisKvCache::open("redis://127.0.0.1:9/")
            .unwrap()
            .with_reconnect_backoff(Duration::from_secs(60));
        cache.backoff.record(Some(Instant::now()));

        let started = Instant::now();
        let results = [
            cache.get("itinerary:abc").await.map(|_| ()),
            cache.set("itinerary:abc", "{}".to_string(), Duration::from_secs(1)).await,
            cache.ping().await,
        ];

        for result in results {
            assert!(matches!(result, Err(CacheError::Unavailable(_))));
        }
        assert!(started.elapsed() < Duration::from_millis(100));
        assert!(!cache.conn.initialized());
    }

    #[test]
    fn open_rejects_malformed_url() {
        assert!(matches!(
            RedisKvCache::open("not a url"),
            Err(CacheError::Initialization(_))
        ));
    }
}
