use crate::error::{Result, ServiceError};
use dashmap::DashMap;
use itinera_cache::CacheClient;
use itinera_core::keys::itinerary_key;
use itinera_core::{
    CacheOutcome, Itinerary, ItineraryId, ItineraryRepository, ItineraryView, StorageError, UserId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

/// Default lifetime of a cached itinerary view.
pub const DEFAULT_VIEW_TTL: Duration = Duration::from_secs(300);

/// How a cache hit is authorized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheHitPolicy {
    /// Compare the requester with the owner recorded in the cached view.
    /// A mismatch is "access denied"; the store is never consulted.
    ///
    /// This departs from the plain read-through path, which returns a hit
    /// without any ownership check. Use [`CacheHitPolicy::Trust`] to get
    /// that behavior back.
    #[default]
    VerifyOwner,
    /// Serve hits to any requester without an ownership check, as the plain
    /// read-through path does. Only the store-backed read that populated
    /// the key was authorized, so any caller who knows the id can read a
    /// cached view for as long as it lives.
    Trust,
}

/// Result of one store read, shared by every caller waiting on it.
type Fetched = std::result::Result<Option<Itinerary>, StorageError>;

/// Cache-aside reads of single itineraries.
///
/// A lookup touches the persistent store at most once, and concurrent misses
/// for the same id wait on a single store read. Existence and ownership are
/// checked by each caller on its own copy of the result. Only reads that
/// pass both checks populate the cache, so a denied or missing itinerary
/// never leaves a view behind.
#[derive(Clone)]
pub struct CachedItineraries {
    store: Arc<dyn ItineraryRepository>,
    cache: CacheClient,
    ttl: Duration,
    policy: CacheHitPolicy,
    in_flight: Arc<DashMap<ItineraryId, Arc<OnceCell<Fetched>>>>,
}

impl CachedItineraries {
    pub fn new(store: Arc<dyn ItineraryRepository>, cache: CacheClient) -> Self {
        Self {
            store,
            cache,
            ttl: DEFAULT_VIEW_TTL,
            policy: CacheHitPolicy::default(),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_policy(mut self, policy: CacheHitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn get(&self, id: &ItineraryId, requester: &UserId) -> Result<ItineraryView> {
        let key = itinerary_key(id);

        match self.cache.get::<ItineraryView>(&key).await {
            CacheOutcome::Ok(Some(view)) => return self.authorize_hit(id, view, requester),
            CacheOutcome::Ok(None) => trace!(id = %id, "view not cached, reading store"),
            CacheOutcome::Degraded => debug!(id = %id, "cache degraded, reading store"),
        }

        let itinerary = self.fetch(id).await?.ok_or(ServiceError::NotFound)?;
        if !itinerary.is_owned_by(requester) {
            debug!(id = %id, requester = %requester, "access denied");
            return Err(ServiceError::AccessDenied);
        }

        let view = ItineraryView::new(itinerary);
        if self.cache.set(&key, &view, self.ttl).await.is_degraded() {
            debug!(id = %id, "view not cached, next read goes to the store");
        }
        Ok(view)
    }

    /// Reads `id` from the store, joining a read already in flight for it.
    async fn fetch(&self, id: &ItineraryId) -> Fetched {
        let flight = self.in_flight.entry(id.clone()).or_default().clone();

        let fetched = flight.get_or_init(|| self.store.get(id)).await.clone();

        // A later miss must start a fresh read rather than reuse this result.
        self.in_flight.remove_if(id, |_, current| Arc::ptr_eq(current, &flight));
        fetched
    }

    fn authorize_hit(
        &self,
        id: &ItineraryId,
        view: ItineraryView,
        requester: &UserId,
    ) -> Result<ItineraryView> {
        match self.policy {
            CacheHitPolicy::Trust => Ok(view),
            CacheHitPolicy::VerifyOwner if view.owner() == requester => Ok(view),
            CacheHitPolicy::VerifyOwner => {
                debug!(id = %id, requester = %requester, "access denied on cached view");
                Err(ServiceError::AccessDenied)
            }
        }
    }
}

impl std::fmt::Debug for CachedItineraries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedItineraries")
            .field("ttl", &self.ttl)
            .field("policy", &self.policy)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}
