use crate::read_through::CacheHitPolicy;
use crate::service::{ItineraryService, ServiceSettings};
use crate::validation::{ActivityInput, ItineraryInput};
use async_trait::async_trait;
use itinera_cache::{CacheClient, MemoryKvCache};
use itinera_core::repository::Result;
use itinera_core::{
    Itinerary, ItineraryId, ItineraryPatch, ItineraryRepository, ListQuery, ManualClock, Page,
    PatchOutcome, StorageError, UserId,
};
use itinera_storage::InMemoryRepository;
use jiff::Timestamp;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-memory store that counts reads, can slow them down, and can be
/// switched into failure.
#[derive(Debug, Default)]
pub(crate) struct CountingRepository {
    inner: InMemoryRepository,
    gets: AtomicUsize,
    read_delay_ms: AtomicU64,
    failing: AtomicBool,
}

impl CountingRepository {
    pub(crate) fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub(crate) fn set_read_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.read_delay_ms.store(millis, Ordering::SeqCst);
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("store is down".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ItineraryRepository for CountingRepository {
    async fn insert(&self, itinerary: Itinerary) -> Result<()> {
        self.check()?;
        self.inner.insert(itinerary).await
    }

    async fn get(&self, id: &ItineraryId) -> Result<Option<Itinerary>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let delay = self.read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.check()?;
        self.inner.get(id).await
    }

    async fn update(
        &self,
        id: &ItineraryId,
        patch: &ItineraryPatch,
        updated_at: Timestamp,
    ) -> Result<PatchOutcome> {
        self.check()?;
        self.inner.update(id, patch, updated_at).await
    }

    async fn delete(&self, id: &ItineraryId) -> Result<bool> {
        self.check()?;
        self.inner.delete(id).await
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Itinerary>> {
        self.check()?;
        self.inner.list(query).await
    }
}

pub(crate) struct Harness {
    pub(crate) service: ItineraryService,
    pub(crate) repo: Arc<CountingRepository>,
    pub(crate) cache: MemoryKvCache,
    pub(crate) clock: ManualClock,
}

pub(crate) fn start_time() -> Timestamp {
    "2024-05-01T09:00:00Z".parse().unwrap()
}

pub(crate) fn harness(policy: CacheHitPolicy) -> Harness {
    let clock = ManualClock::new(start_time());
    let cache = MemoryKvCache::with_clock(Arc::new(clock.clone()));
    let repo = Arc::new(CountingRepository::default());

    let settings = ServiceSettings::builder()
        .hit_policy(policy)
        .clock(Arc::new(clock.clone()))
        .build();
    let service = ItineraryService::new(repo.clone(), CacheClient::new(cache.clone()), settings);

    Harness {
        service,
        repo,
        cache,
        clock,
    }
}

pub(crate) fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

pub(crate) fn trip(title: &str) -> ItineraryInput {
    ItineraryInput {
        title: Some(title.to_string()),
        destination: Some("Paris, France".to_string()),
        start_date: Some("2024-06-01".to_string()),
        end_date: Some("2024-06-05".to_string()),
        activities: Some(vec![ActivityInput {
            time: Some("10:00".to_string()),
            description: Some("Louvre".to_string()),
            location: Some("Rue de Rivoli".to_string()),
        }]),
    }
}
