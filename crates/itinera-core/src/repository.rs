use crate::error::StorageError;
use crate::id::{ItineraryId, UserId};
use crate::itinerary::{Itinerary, ItineraryPatch};
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Ordering applied when listing itineraries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    /// Newest first.
    #[default]
    CreatedAt,
    /// Earliest trip first.
    StartDate,
    /// Alphabetical.
    Title,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "createdAt",
            SortField::StartDate => "startDate",
            SortField::Title => "title",
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "createdAt" => Ok(SortField::CreatedAt),
            "startDate" => Ok(SortField::StartDate),
            "title" => Ok(SortField::Title),
            other => Err(format!("unknown sort field '{other}'")),
        }
    }
}

impl Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page request over one owner's itineraries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub owner: UserId,
    /// Case-insensitive substring filter on the destination.
    pub destination: Option<String>,
    pub sort: SortField,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
}

impl ListQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Returns whether `itinerary` passes the owner and destination filters.
    pub fn matches(&self, itinerary: &Itinerary) -> bool {
        if itinerary.owner != self.owner {
            return false;
        }
        match &self.destination {
            Some(needle) => itinerary
                .destination
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            None => true,
        }
    }
}

/// One page of results plus the total number of matches across all pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Result of applying an [`ItineraryPatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The patch was written; carries the record as stored.
    Applied(Itinerary),
    /// No itinerary with that id exists.
    Missing,
    /// The merged record would end before it starts. Nothing was written.
    DatesOutOfOrder,
}

/// The persistent store of itineraries.
///
/// The store is the source of truth. It knows nothing about caching or
/// ownership rules; callers enforce both.
#[async_trait]
pub trait ItineraryRepository: Send + Sync + 'static {
    /// Inserts a new itinerary. Returns `Err(Conflict)` if the id is taken.
    async fn insert(&self, itinerary: Itinerary) -> Result<()>;

    /// Retrieves an itinerary by id. Returns `None` if it does not exist.
    async fn get(&self, id: &ItineraryId) -> Result<Option<Itinerary>>;

    /// Applies `patch` to the current record and stamps it with `updated_at`.
    ///
    /// The date check and the write happen as one step against the stored
    /// record, so concurrent patches to different fields do not overwrite
    /// each other.
    async fn update(
        &self,
        id: &ItineraryId,
        patch: &ItineraryPatch,
        updated_at: Timestamp,
    ) -> Result<PatchOutcome>;

    /// Deletes an itinerary.
    /// Returns `true` if the record existed and was removed.
    async fn delete(&self, id: &ItineraryId) -> Result<bool>;

    /// Lists the owner's itineraries matching the query, one page at a time.
    async fn list(&self, query: &ListQuery) -> Result<Page<Itinerary>>;
}

#[async_trait]
impl<T: ItineraryRepository + ?Sized> ItineraryRepository for Arc<T> {
    async fn insert(&self, itinerary: Itinerary) -> Result<()> {
        (**self).insert(itinerary).await
    }

    async fn get(&self, id: &ItineraryId) -> Result<Option<Itinerary>> {
        (**self).get(id).await
    }

    async fn update(
        &self,
        id: &ItineraryId,
        patch: &ItineraryPatch,
        updated_at: Timestamp,
    ) -> Result<PatchOutcome> {
        (**self).update(id, patch, updated_at).await
    }

    async fn delete(&self, id: &ItineraryId) -> Result<bool> {
        (**self).delete(id).await
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Itinerary>> {
        (**self).list(query).await
    }
}
