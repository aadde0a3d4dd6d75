use crate::error::{Result, ServiceError};
use crate::generator::{Generator, RandomTokenGenerator};
use crate::invalidation::CacheInvalidator;
use crate::read_through::{CacheHitPolicy, CachedItineraries, DEFAULT_VIEW_TTL};
use crate::share::{ShareStore, DEFAULT_SHARE_TTL};
use crate::store::TimedRepository;
use crate::validation::{dates_out_of_order, ItineraryInput, ListParams};
use itinera_cache::CacheClient;
use itinera_core::{
    Clock, Itinerary, ItineraryId, ItineraryRepository, ItineraryView, PatchOutcome,
    PublicItinerary, ShareableId, SystemClock, UserId,
};
use jiff::Timestamp;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

/// Default bound on a single persistent store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

fn random_tokens() -> Arc<dyn Generator<Output = ShareableId>> {
    Arc::new(RandomTokenGenerator::new())
}

/// Tunables for [`ItineraryService`].
///
/// ```rust
/// use itinera_service::ServiceSettings;
/// use std::time::Duration;
///
/// let settings = ServiceSettings::builder()
///     .store_timeout(Duration::from_secs(2))
///     .build();
/// assert_eq!(settings.view_ttl, Duration::from_secs(300));
/// ```
#[derive(Clone, TypedBuilder)]
pub struct ServiceSettings {
    /// Lifetime of a cached itinerary view.
    #[builder(default = DEFAULT_VIEW_TTL)]
    pub view_ttl: Duration,
    /// Lifetime of a share snapshot.
    #[builder(default = DEFAULT_SHARE_TTL)]
    pub share_ttl: Duration,
    #[builder(default = DEFAULT_STORE_TIMEOUT)]
    pub store_timeout: Duration,
    #[builder(default)]
    pub hit_policy: CacheHitPolicy,
    #[builder(default = system_clock())]
    pub clock: Arc<dyn Clock>,
    #[builder(default = random_tokens())]
    pub share_tokens: Arc<dyn Generator<Output = ShareableId>>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// One page of a user's itineraries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub items: Vec<Itinerary>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    pub shareable_id: ShareableId,
    pub shareable_url: String,
    pub expires_in: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedItinerary {
    pub itinerary: PublicItinerary,
    pub shared_at: Timestamp,
}

/// Advertised lifetime of a share link. This is a fixed string: it does not
/// follow the configured snapshot TTL.
pub const SHARE_EXPIRES_IN: &str = "24 hours";

/// Every itinerary operation, with caching applied.
///
/// Writes go to the store first and invalidate the cached view only after
/// the store has accepted them. Single reads go through the cache. Listing
/// and share creation always read the store.
#[derive(Clone)]
pub struct ItineraryService {
    store: Arc<dyn ItineraryRepository>,
    reads: CachedItineraries,
    invalidator: CacheInvalidator,
    shares: ShareStore,
    clock: Arc<dyn Clock>,
}

impl ItineraryService {
    pub fn new(
        store: impl ItineraryRepository,
        cache: CacheClient,
        settings: ServiceSettings,
    ) -> Self {
        let store: Arc<dyn ItineraryRepository> =
            Arc::new(TimedRepository::new(store, settings.store_timeout));

        let reads = CachedItineraries::new(store.clone(), cache.clone())
            .with_ttl(settings.view_ttl)
            .with_policy(settings.hit_policy);
        let shares = ShareStore::new(cache.clone())
            .with_tokens(settings.share_tokens)
            .with_clock(settings.clock.clone())
            .with_ttl(settings.share_ttl);

        Self {
            store,
            reads,
            invalidator: CacheInvalidator::new(cache),
            shares,
            clock: settings.clock,
        }
    }

    pub async fn create(&self, owner: &UserId, input: ItineraryInput) -> Result<Itinerary> {
        let new = input.into_new()?;
        let now = self.clock.now();

        let itinerary = Itinerary {
            id: ItineraryId::generate(),
            owner: owner.clone(),
            title: new.title,
            destination: new.destination,
            start_date: new.start_date,
            end_date: new.end_date,
            activities: new.activities,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(itinerary.clone()).await?;
        info!(id = %itinerary.id, owner = %owner, "itinerary created");
        Ok(itinerary)
    }

    pub async fn list(&self, owner: &UserId, params: ListParams) -> Result<Listing> {
        let query = params.into_query(owner.clone())?;
        let page = self.store.list(&query).await?;

        Ok(Listing {
            items: page.items,
            page: query.page,
            limit: query.limit,
            total: page.total,
            pages: page.total.div_ceil(u64::from(query.limit)),
        })
    }

    pub async fn get(&self, id: &ItineraryId, requester: &UserId) -> Result<ItineraryView> {
        self.reads.get(id, requester).await
    }

    pub async fn update(
        &self,
        id: &ItineraryId,
        requester: &UserId,
        input: ItineraryInput,
    ) -> Result<Itinerary> {
        let patch = input.into_patch()?;
        // Owners never change, so the check can precede the write.
        self.owned(id, requester).await?;

        let itinerary = match self.store.update(id, &patch, self.clock.now()).await? {
            PatchOutcome::Applied(itinerary) => itinerary,
            PatchOutcome::Missing => return Err(ServiceError::NotFound),
            PatchOutcome::DatesOutOfOrder => {
                return Err(ServiceError::Validation(vec![dates_out_of_order()]))
            }
        };
        self.invalidator.itinerary_changed(id).await;

        info!(id = %id, "itinerary updated");
        Ok(itinerary)
    }

    pub async fn delete(&self, id: &ItineraryId, requester: &UserId) -> Result<()> {
        self.owned(id, requester).await?;

        if !self.store.delete(id).await? {
            return Err(ServiceError::NotFound);
        }
        self.invalidator.itinerary_changed(id).await;

        info!(id = %id, "itinerary deleted");
        Ok(())
    }

    /// Creates a share link for an owned itinerary.
    ///
    /// `base_url` is the externally visible origin, e.g. `https://example.com`.
    pub async fn share(
        &self,
        id: &ItineraryId,
        requester: &UserId,
        base_url: &str,
    ) -> Result<ShareLink> {
        let itinerary = self.owned(id, requester).await?;
        let token = self
            .shares
            .create(&itinerary)
            .await
            .map_err(|_| ServiceError::ShareUnavailable)?;

        Ok(ShareLink {
            shareable_url: format!(
                "{}/api/itineraries/share/{}",
                base_url.trim_end_matches('/'),
                token
            ),
            shareable_id: token,
            expires_in: SHARE_EXPIRES_IN.to_string(),
        })
    }

    /// Resolves a share token. Malformed tokens are never looked up.
    pub async fn resolve_share(&self, token: &str) -> Option<SharedItinerary> {
        let token = match ShareableId::new(token) {
            Ok(token) => token,
            Err(e) => {
                debug!(error = %e, "rejecting malformed share token");
                return None;
            }
        };

        self.shares.resolve(&token).await.map(|snapshot| SharedItinerary {
            itinerary: snapshot.data,
            shared_at: snapshot.created_at,
        })
    }

    /// Loads an itinerary from the store and checks the requester owns it.
    async fn owned(&self, id: &ItineraryId, requester: &UserId) -> Result<Itinerary> {
        let itinerary = self.store.get(id).await?.ok_or(ServiceError::NotFound)?;
        if !itinerary.is_owned_by(requester) {
            debug!(id = %id, requester = %requester, "access denied");
            return Err(ServiceError::AccessDenied);
        }
        Ok(itinerary)
    }
}

impl std::fmt::Debug for ItineraryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItineraryService")
            .field("reads", &self.reads)
            .field("shares", &self.shares)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{harness, trip, user};
    use itinera_core::StorageError;
    use jiff::SignedDuration;

    #[tokio::test]
    async fn create_assigns_id_owner_and_timestamps() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");

        let it = h.service.create(&alice, trip("Paris")).await.unwrap();

        assert_eq!(it.owner, alice);
        assert_eq!(it.created_at, crate::testing::start_time());
        assert_eq!(it.created_at, it.updated_at);
        assert_eq!(it.id.as_str().len(), 24);
        assert!(h.cache.is_empty(), "create must not populate the cache");
    }

    #[tokio::test]
    async fn create_rejects_invalid_input() {
        let h = harness(CacheHitPolicy::default());
        let mut input = trip("Paris");
        input.destination = None;

        let err = h.service.create(&user("alice"), input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e[0].field == "destination"));
    }

    #[tokio::test]
    async fn list_reports_pages() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        for i in 0..5 {
            h.service.create(&alice, trip(&format!("Trip {i}"))).await.unwrap();
        }
        h.service.create(&user("bob"), trip("Bob")).await.unwrap();

        let listing = h
            .service
            .list(
                &alice,
                ListParams {
                    limit: Some("2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(listing.total, 5);
        assert_eq!(listing.pages, 3);
        assert_eq!(listing.items.len(), 2);
        assert_eq!((listing.page, listing.limit), (1, 2));
    }

    #[tokio::test]
    async fn get_reads_store_once_then_serves_cache() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        let it = h.service.create(&alice, trip("Paris")).await.unwrap();

        let first = h.service.get(&it.id, &alice).await.unwrap();
        let second = h.service.get(&it.id, &alice).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(h.repo.gets(), 1);
    }

    #[tokio::test]
    async fn cached_view_expires_after_ttl() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        let it = h.service.create(&alice, trip("Paris")).await.unwrap();

        h.service.get(&it.id, &alice).await.unwrap();
        h.clock.advance(SignedDuration::from_secs(299));
        h.service.get(&it.id, &alice).await.unwrap();
        assert_eq!(h.repo.gets(), 1);

        h.clock.advance(SignedDuration::from_secs(1));
        h.service.get(&it.id, &alice).await.unwrap();
        assert_eq!(h.repo.gets(), 2);
    }

    #[tokio::test]
    async fn update_invalidates_cached_view() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        let it = h.service.create(&alice, trip("Paris")).await.unwrap();
        h.service.get(&it.id, &alice).await.unwrap();

        h.clock.advance(SignedDuration::from_secs(10));
        let updated = h
            .service
            .update(&it.id, &alice, trip("Paris in spring"))
            .await
            .unwrap();
        assert_eq!(
            updated.updated_at,
            crate::testing::start_time() + SignedDuration::from_secs(10)
        );

        let view = h.service.get(&it.id, &alice).await.unwrap();
        assert_eq!(view.itinerary.title, "Paris in spring");
        assert_eq!(h.repo.gets(), 3, "initial read, update lookup, post-invalidation read");
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        let it = h.service.create(&alice, trip("Paris")).await.unwrap();

        let updated = h
            .service
            .update(
                &it.id,
                &alice,
                ItineraryInput {
                    destination: Some("Lyon".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Paris");
        assert_eq!(updated.destination, "Lyon");
        assert_eq!(updated.activities, it.activities);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_partial_updates_keep_both_edits() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        let it = h.service.create(&alice, trip("Paris")).await.unwrap();
        // Both updates finish their ownership lookup before either writes.
        h.repo.set_read_delay(Duration::from_millis(50));

        let retitle = {
            let service = h.service.clone();
            let (id, alice) = (it.id.clone(), alice.clone());
            tokio::spawn(async move {
                let input = ItineraryInput {
                    title: Some("Paris in spring".to_string()),
                    ..Default::default()
                };
                service.update(&id, &alice, input).await
            })
        };
        let move_to_lyon = {
            let service = h.service.clone();
            let (id, alice) = (it.id.clone(), alice.clone());
            tokio::spawn(async move {
                let input = ItineraryInput {
                    destination: Some("Lyon".to_string()),
                    ..Default::default()
                };
                service.update(&id, &alice, input).await
            })
        };
        retitle.await.unwrap().unwrap();
        move_to_lyon.await.unwrap().unwrap();

        h.repo.set_read_delay(Duration::ZERO);
        let view = h.service.get(&it.id, &alice).await.unwrap();
        assert_eq!(view.itinerary.title, "Paris in spring");
        assert_eq!(view.itinerary.destination, "Lyon");
    }

    #[tokio::test]
    async fn update_rejects_inverted_merged_dates() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        let it = h.service.create(&alice, trip("Paris")).await.unwrap();

        let err = h
            .service
            .update(
                &it.id,
                &alice,
                ItineraryInput {
                    end_date: Some("2024-05-01".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(ref e) if e[0].field == "endDate"));
    }

    #[tokio::test]
    async fn writes_by_non_owner_are_denied_and_keep_cache() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        let bob = user("bob");
        let it = h.service.create(&alice, trip("Paris")).await.unwrap();
        h.service.get(&it.id, &alice).await.unwrap();

        assert!(matches!(
            h.service.update(&it.id, &bob, trip("Mine now")).await,
            Err(ServiceError::AccessDenied)
        ));
        assert!(matches!(
            h.service.delete(&it.id, &bob).await,
            Err(ServiceError::AccessDenied)
        ));
        assert_eq!(h.cache.len(), 1);
    }

    #[tokio::test]
    async fn delete_invalidates_and_later_reads_miss() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        let it = h.service.create(&alice, trip("Paris")).await.unwrap();
        h.service.get(&it.id, &alice).await.unwrap();

        h.service.delete(&it.id, &alice).await.unwrap();

        assert!(h.cache.is_empty());
        assert!(matches!(
            h.service.get(&it.id, &alice).await,
            Err(ServiceError::NotFound)
        ));
        assert!(matches!(
            h.service.delete(&it.id, &alice).await,
            Err(ServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn writes_succeed_when_cache_is_down() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        let it = h.service.create(&alice, trip("Paris")).await.unwrap();
        h.cache.set_available(false);

        let updated = h
            .service
            .update(&it.id, &alice, trip("Still works"))
            .await
            .unwrap();
        assert_eq!(updated.title, "Still works");

        let view = h.service.get(&it.id, &alice).await.unwrap();
        assert_eq!(view.itinerary.title, "Still works");

        h.service.delete(&it.id, &alice).await.unwrap();
    }

    #[tokio::test]
    async fn store_failure_fails_the_operation() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        let it = h.service.create(&alice, trip("Paris")).await.unwrap();
        h.repo.set_failing(true);

        assert!(matches!(
            h.service.get(&it.id, &alice).await,
            Err(ServiceError::Storage(StorageError::Unavailable(_)))
        ));
        assert!(matches!(
            h.service.create(&alice, trip("Rome")).await,
            Err(ServiceError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn share_returns_link_for_owner() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        let it = h.service.create(&alice, trip("Paris")).await.unwrap();

        let link = h
            .service
            .share(&it.id, &alice, "https://trips.example.com/")
            .await
            .unwrap();

        assert_eq!(link.expires_in, "24 hours");
        assert_eq!(link.shareable_id.as_str().len(), 16);
        assert_eq!(
            link.shareable_url,
            format!(
                "https://trips.example.com/api/itineraries/share/{}",
                link.shareable_id
            )
        );
        assert_eq!(
            h.cache.ttl(&format!("shareable:{}", link.shareable_id)),
            Some(SignedDuration::from_secs(86_400))
        );
    }

    #[tokio::test]
    async fn share_checks_existence_then_ownership() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        let it = h.service.create(&alice, trip("Paris")).await.unwrap();
        let missing = ItineraryId::new("missing").unwrap();

        assert!(matches!(
            h.service.share(&missing, &alice, "http://x").await,
            Err(ServiceError::NotFound)
        ));
        assert!(matches!(
            h.service.share(&it.id, &user("bob"), "http://x").await,
            Err(ServiceError::AccessDenied)
        ));
    }

    #[tokio::test]
    async fn share_fails_when_cache_unavailable() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        let it = h.service.create(&alice, trip("Paris")).await.unwrap();
        h.cache.set_available(false);

        assert!(matches!(
            h.service.share(&it.id, &alice, "http://x").await,
            Err(ServiceError::ShareUnavailable)
        ));
    }

    #[tokio::test]
    async fn resolve_share_returns_public_snapshot() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        let it = h.service.create(&alice, trip("Paris")).await.unwrap();
        let link = h.service.share(&it.id, &alice, "http://x").await.unwrap();

        let shared = h
            .service
            .resolve_share(link.shareable_id.as_str())
            .await
            .unwrap();

        assert_eq!(shared.itinerary, it.to_public());
        assert_eq!(shared.shared_at, crate::testing::start_time());
    }

    #[tokio::test]
    async fn snapshot_outlives_source_changes() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        let it = h.service.create(&alice, trip("Paris")).await.unwrap();
        let link = h.service.share(&it.id, &alice, "http://x").await.unwrap();

        h.service
            .update(&it.id, &alice, trip("Renamed"))
            .await
            .unwrap();
        let shared = h
            .service
            .resolve_share(link.shareable_id.as_str())
            .await
            .unwrap();
        assert_eq!(shared.itinerary.title, "Paris");

        h.service.delete(&it.id, &alice).await.unwrap();
        assert!(h
            .service
            .resolve_share(link.shareable_id.as_str())
            .await
            .is_some());
    }

    #[tokio::test]
    async fn resolve_share_misses_are_absent() {
        let h = harness(CacheHitPolicy::default());
        let alice = user("alice");
        let it = h.service.create(&alice, trip("Paris")).await.unwrap();
        let link = h.service.share(&it.id, &alice, "http://x").await.unwrap();

        assert!(h.service.resolve_share("0000000000000000").await.is_none());
        assert!(h.service.resolve_share("not-a-token").await.is_none());

        h.clock.advance(SignedDuration::from_secs(86_400));
        assert!(h
            .service
            .resolve_share(link.shareable_id.as_str())
            .await
            .is_none());
    }
}
