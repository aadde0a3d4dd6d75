use crate::generator::{Generator, RandomTokenGenerator};
use itinera_cache::CacheClient;
use itinera_core::keys::shareable_key;
use itinera_core::{CacheOutcome, Clock, Itinerary, ShareSnapshot, ShareableId, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default lifetime of a share snapshot.
pub const DEFAULT_SHARE_TTL: Duration = Duration::from_secs(86_400);

/// The cache could not accept a new snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("share store is unavailable")]
pub struct ShareUnavailable;

/// Issues and resolves shareable snapshots.
///
/// A snapshot is a frozen copy of an itinerary stored under
/// `shareable:<token>`. It lives only in the cache, expires on its own
/// clock, and is independent of the source itinerary from the moment it is
/// written: later edits or deletion do not touch it.
#[derive(Clone)]
pub struct ShareStore {
    cache: CacheClient,
    tokens: Arc<dyn Generator<Output = ShareableId>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ShareStore {
    pub fn new(cache: CacheClient) -> Self {
        Self {
            cache,
            tokens: Arc::new(RandomTokenGenerator::new()),
            clock: Arc::new(SystemClock),
            ttl: DEFAULT_SHARE_TTL,
        }
    }

    pub fn with_tokens(mut self, tokens: Arc<dyn Generator<Output = ShareableId>>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Captures `itinerary` and stores it under a fresh token.
    ///
    /// Availability is checked up front so that an outage is reported
    /// rather than handing out a token nothing was stored under.
    pub async fn create(&self, itinerary: &Itinerary) -> Result<ShareableId, ShareUnavailable> {
        if !self.cache.is_available().await {
            warn!(id = %itinerary.id, "cache unavailable, cannot create share link");
            return Err(ShareUnavailable);
        }

        let token = self.tokens.generate();
        let snapshot = ShareSnapshot::capture(itinerary, self.clock.now());

        match self
            .cache
            .set(&shareable_key(&token), &snapshot, self.ttl)
            .await
        {
            CacheOutcome::Ok(()) => {
                info!(id = %itinerary.id, token = %token, "share link created");
                Ok(token)
            }
            CacheOutcome::Degraded => {
                warn!(id = %itinerary.id, "failed to store share snapshot");
                Err(ShareUnavailable)
            }
        }
    }

    /// Looks a snapshot up by token.
    ///
    /// Missing, expired, and unreachable all read as `None`; the last one is
    /// logged by the cache client so it can be told apart in the logs.
    pub async fn resolve(&self, token: &ShareableId) -> Option<ShareSnapshot> {
        match self
            .cache
            .get::<ShareSnapshot>(&shareable_key(token))
            .await
        {
            CacheOutcome::Ok(found) => {
                if found.is_none() {
                    debug!(token = %token, "share snapshot not found or expired");
                }
                found
            }
            CacheOutcome::Degraded => {
                warn!(token = %token, "cache degraded, treating share snapshot as absent");
                None
            }
        }
    }
}

impl std::fmt::Debug for ShareStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
