use async_trait::async_trait;
use itinera_core::repository::{ItineraryRepository, ListQuery, Page, PatchOutcome, Result};
use itinera_core::{Itinerary, ItineraryId, ItineraryPatch, StorageError};
use jiff::Timestamp;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounds every call to the wrapped store by a deadline.
///
/// A store that does not answer in time fails the call with
/// [`StorageError::Timeout`] instead of hanging the request.
#[derive(Debug, Clone)]
pub struct TimedRepository<R> {
    inner: R,
    timeout: Duration,
}

impl<R: ItineraryRepository> TimedRepository<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "store call timed out"
                );
                Err(StorageError::Timeout(format!(
                    "{operation} exceeded {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

#[async_trait]
impl<R: ItineraryRepository> ItineraryRepository for TimedRepository<R> {
    async fn insert(&self, itinerary: Itinerary) -> Result<()> {
        self.bounded("insert", self.inner.insert(itinerary)).await
    }

    async fn get(&self, id: &ItineraryId) -> Result<Option<Itinerary>> {
        self.bounded("get", self.inner.get(id)).await
    }

    async fn update(
        &self,
        id: &ItineraryId,
        patch: &ItineraryPatch,
        updated_at: Timestamp,
    ) -> Result<PatchOutcome> {
        self.bounded("update", self.inner.update(id, patch, updated_at)).await
    }

    async fn delete(&self, id: &ItineraryId) -> Result<bool> {
        self.bounded("delete", self.inner.delete(id)).await
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Itinerary>> {
        self.bounded("list", self.inner.list(query)).await
    }
}
