use itinera_cache::CacheClient;
use itinera_core::keys::itinerary_key;
use itinera_core::{CacheOutcome, ItineraryId};
use tracing::{debug, warn};

/// Drops cached views after the store has committed a write.
///
/// Invalidation is best effort. If the cache cannot be reached the write
/// still succeeds and the stale view ages out with its TTL.
#[derive(Debug, Clone)]
pub struct CacheInvalidator {
    cache: CacheClient,
}

impl CacheInvalidator {
    pub fn new(cache: CacheClient) -> Self {
        Self { cache }
    }

    /// Call only after the update or delete of `id` has been persisted.
    pub async fn itinerary_changed(&self, id: &ItineraryId) {
        match self.cache.delete_by_pattern(&itinerary_key(id)).await {
            CacheOutcome::Ok(removed) => debug!(id = %id, removed, "invalidated cached view"),
            CacheOutcome::Degraded => {
                warn!(id = %id, "could not invalidate cached view; it expires with its ttl")
            }
        }
    }
}
