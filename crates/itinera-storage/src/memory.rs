use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use itinera_core::repository::{
    ItineraryRepository, ListQuery, Page, PatchOutcome, Result, SortField,
};
use itinera_core::{Itinerary, ItineraryId, ItineraryPatch, StorageError};
use jiff::Timestamp;
use std::cmp::Ordering;

/// In-memory implementation of [`ItineraryRepository`] using DashMap.
///
/// DashMap provides better concurrency than RwLock<HashMap> because it
/// uses sharded locks, allowing concurrent reads and writes to different
/// buckets without blocking.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    storage: DashMap<ItineraryId, Itinerary>,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
        }
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: DashMap::with_capacity(capacity),
        }
    }
}

fn compare(sort: SortField, a: &Itinerary, b: &Itinerary) -> Ordering {
    let primary = match sort {
        SortField::CreatedAt => b.created_at.cmp(&a.created_at),
        SortField::StartDate => a.start_date.cmp(&b.start_date),
        SortField::Title => a.title.cmp(&b.title),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl ItineraryRepository for InMemoryRepository {
    async fn insert(&self, itinerary: Itinerary) -> Result<()> {
        match self.storage.entry(itinerary.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(itinerary.id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(itinerary);
                Ok(())
            }
        }
    }

    async fn get(&self, id: &ItineraryId) -> Result<Option<Itinerary>> {
        Ok(self.storage.get(id).map(|entry| entry.value().clone()))
    }

    async fn update(
        &self,
        id: &ItineraryId,
        patch: &ItineraryPatch,
        updated_at: Timestamp,
    ) -> Result<PatchOutcome> {
        // The shard stays write-locked from the check to the clone.
        let Some(mut entry) = self.storage.get_mut(id) else {
            return Ok(PatchOutcome::Missing);
        };
        if !patch.keeps_dates_ordered(&entry) {
            return Ok(PatchOutcome::DatesOutOfOrder);
        }
        patch.apply(&mut entry);
        entry.updated_at = updated_at;
        Ok(PatchOutcome::Applied(entry.clone()))
    }

    async fn delete(&self, id: &ItineraryId) -> Result<bool> {
        Ok(self.storage.remove(id).is_some())
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Itinerary>> {
        let mut matches: Vec<Itinerary> = self
            .storage
            .iter()
            .filter(|entry| query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        let total = matches.len() as u64;
        matches.sort_by(|a, b| compare(query.sort, a, b));

        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = matches
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();

        Ok(Page { items, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itinera_core::UserId;
    use jiff::SignedDuration;

    fn user(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn itinerary(
        id: &str,
        owner: &str,
        title: &str,
        destination: &str,
        offset_days: i32,
    ) -> Itinerary {
        let base = Timestamp::from_second(1_717_200_000).unwrap();
        let day = SignedDuration::from_hours(24);
        Itinerary {
            id: ItineraryId::new(id).unwrap(),
            owner: user(owner),
            title: title.to_string(),
            destination: destination.to_string(),
            start_date: base + day * offset_days,
            end_date: base + day * (offset_days + 3),
            activities: Vec::new(),
            created_at: base - day * offset_days,
            updated_at: base,
        }
    }

    fn query(owner: &str) -> ListQuery {
        ListQuery {
            owner: user(owner),
            destination: None,
            sort: SortField::CreatedAt,
            page: 1,
            limit: 10,
        }
    }

    async fn seeded() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        for it in [
            itinerary("a1", "alice", "Beach week", "Lisbon, Portugal", 1),
            itinerary("a2", "alice", "Alps", "Zermatt, Switzerland", 2),
            itinerary("a3", "alice", "City break", "Porto, PORTUGAL", 3),
            itinerary("b1", "bob", "Bob's trip", "Lisbon, Portugal", 1),
        ] {
            repo.insert(it).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn insert_and_get() {
        let repo = InMemoryRepository::new();
        let it = itinerary("abc123", "alice", "Trip", "Rome", 0);

        repo.insert(it.clone()).await.unwrap();

        let got = repo.get(&it.id).await.unwrap();
        assert_eq!(got, Some(it));
    }

    #[tokio::test]
    async fn insert_conflicts_on_duplicate_id() {
        let repo = InMemoryRepository::new();
        let it = itinerary("abc123", "alice", "Trip", "Rome", 0);

        repo.insert(it.clone()).await.unwrap();
        let err = repo.insert(it).await.unwrap_err();

        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_patches_existing_only() {
        let repo = InMemoryRepository::new();
        let it = itinerary("abc123", "alice", "Trip", "Rome", 0);
        let later = it.updated_at + SignedDuration::from_secs(60);
        let rename = ItineraryPatch {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };

        assert_eq!(
            repo.update(&it.id, &rename, later).await.unwrap(),
            PatchOutcome::Missing
        );

        repo.insert(it.clone()).await.unwrap();
        let PatchOutcome::Applied(stored) = repo.update(&it.id, &rename, later).await.unwrap()
        else {
            panic!("patch was not applied");
        };
        assert_eq!(stored.title, "Renamed");
        assert_eq!(stored.destination, "Rome");
        assert_eq!(stored.updated_at, later);
        assert_eq!(repo.get(&it.id).await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn interleaved_patches_keep_both_fields() {
        let repo = InMemoryRepository::new();
        let it = itinerary("abc123", "alice", "Trip", "Rome", 0);
        repo.insert(it.clone()).await.unwrap();

        // Both writers start from the same version of the record.
        let seen_by_first = repo.get(&it.id).await.unwrap().unwrap();
        let seen_by_second = repo.get(&it.id).await.unwrap().unwrap();
        assert_eq!(seen_by_first, seen_by_second);

        let title = ItineraryPatch {
            title: Some("Roman holiday".to_string()),
            ..Default::default()
        };
        let destination = ItineraryPatch {
            destination: Some("Florence".to_string()),
            ..Default::default()
        };
        repo.update(&it.id, &title, it.updated_at).await.unwrap();
        repo.update(&it.id, &destination, it.updated_at).await.unwrap();

        let stored = repo.get(&it.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Roman holiday");
        assert_eq!(stored.destination, "Florence");
    }

    #[tokio::test]
    async fn update_refuses_out_of_order_dates() {
        let repo = InMemoryRepository::new();
        let it = itinerary("abc123", "alice", "Trip", "Rome", 0);
        repo.insert(it.clone()).await.unwrap();

        let shorten = ItineraryPatch {
            end_date: Some(it.start_date + SignedDuration::from_hours(1)),
            ..Default::default()
        };
        let inverted = ItineraryPatch {
            start_date: Some(it.end_date),
            ..Default::default()
        };
        assert!(matches!(
            repo.update(&it.id, &shorten, it.updated_at).await.unwrap(),
            PatchOutcome::Applied(_)
        ));
        // Valid against the original end date, but not against the stored one.
        assert_eq!(
            repo.update(&it.id, &inverted, it.updated_at).await.unwrap(),
            PatchOutcome::DatesOutOfOrder
        );
        assert_eq!(
            repo.get(&it.id).await.unwrap().unwrap().start_date,
            it.start_date
        );
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let repo = InMemoryRepository::new();
        let it = itinerary("abc123", "alice", "Trip", "Rome", 0);
        repo.insert(it.clone()).await.unwrap();

        assert!(repo.delete(&it.id).await.unwrap());
        assert!(repo.get(&it.id).await.unwrap().is_none());
        assert!(!repo.delete(&it.id).await.unwrap());
    }

    #[tokio::test]
    async fn list_is_scoped_to_owner_newest_first() {
        let repo = seeded().await;

        let page = repo.list(&query("alice")).await.unwrap();

        assert_eq!(page.total, 3);
        let ids: Vec<&str> = page.items.iter().map(|it| it.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
    }

    #[tokio::test]
    async fn list_filters_destination_case_insensitively() {
        let repo = seeded().await;
        let mut q = query("alice");
        q.destination = Some("portugal".to_string());

        let page = repo.list(&q).await.unwrap();

        assert_eq!(page.total, 2);
        assert!(page
            .items
            .iter()
            .all(|it| it.destination.to_lowercase().contains("portugal")));
    }

    #[tokio::test]
    async fn list_sorts_by_start_date_and_title() {
        let repo = seeded().await;

        let mut q = query("alice");
        q.sort = SortField::StartDate;
        let ids: Vec<String> = repo
            .list(&q)
            .await
            .unwrap()
            .items
            .into_iter()
            .map(|it| it.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);

        q.sort = SortField::Title;
        let titles: Vec<String> = repo
            .list(&q)
            .await
            .unwrap()
            .items
            .into_iter()
            .map(|it| it.title)
            .collect();
        assert_eq!(titles, vec!["Alps", "Beach week", "City break"]);
    }

    #[tokio::test]
    async fn list_paginates_with_total() {
        let repo = seeded().await;
        let mut q = query("alice");
        q.limit = 2;
        q.page = 2;

        let page = repo.list(&q).await.unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id.as_str(), "a3");

        q.page = 5;
        let page = repo.list(&q).await.unwrap();
        assert_eq!(page.total, 3);
        assert!(page.items.is_empty());
    }
}
