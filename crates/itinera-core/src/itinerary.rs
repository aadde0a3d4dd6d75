use crate::id::{ItineraryId, UserId};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A single scheduled entry within an itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub time: String,
    pub description: String,
    pub location: String,
}

/// A stored itinerary record.
///
/// This is the authoritative shape kept by the persistent store. The owner
/// serializes as `userId` to match the wire format clients already use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    pub id: ItineraryId,
    #[serde(rename = "userId")]
    pub owner: UserId,
    pub title: String,
    pub destination: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    #[serde(default)]
    pub activities: Vec<Activity>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Itinerary {
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.owner == *user
    }

    /// Projects the record into its public form, dropping the id and owner.
    pub fn to_public(&self) -> PublicItinerary {
        PublicItinerary {
            title: self.title.clone(),
            destination: self.destination.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            activities: self.activities.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A partial update. `None` leaves a field untouched.
///
/// Stores apply a patch to the record they hold at write time, so two
/// patches touching different fields both survive when they race.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItineraryPatch {
    pub title: Option<String>,
    pub destination: Option<String>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub activities: Option<Vec<Activity>>,
}

impl ItineraryPatch {
    /// Returns the trip dates `itinerary` would have with this patch applied.
    pub fn merged_dates(&self, itinerary: &Itinerary) -> (Timestamp, Timestamp) {
        (
            self.start_date.unwrap_or(itinerary.start_date),
            self.end_date.unwrap_or(itinerary.end_date),
        )
    }

    /// Returns whether the patched record would still end after it starts.
    pub fn keeps_dates_ordered(&self, itinerary: &Itinerary) -> bool {
        let (start, end) = self.merged_dates(itinerary);
        end > start
    }

    /// Writes the supplied fields into `itinerary`.
    pub fn apply(&self, itinerary: &mut Itinerary) {
        if let Some(title) = &self.title {
            itinerary.title.clone_from(title);
        }
        if let Some(destination) = &self.destination {
            itinerary.destination.clone_from(destination);
        }
        if let Some(start_date) = self.start_date {
            itinerary.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            itinerary.end_date = end_date;
        }
        if let Some(activities) = &self.activities {
            itinerary.activities.clone_from(activities);
        }
    }
}

/// The cached and returned representation of a single itinerary.
///
/// The full record (owner included) is kept so a cached view can still be
/// checked against the requester without consulting the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryView {
    pub itinerary: Itinerary,
}

impl ItineraryView {
    pub fn new(itinerary: Itinerary) -> Self {
        Self { itinerary }
    }

    pub fn owner(&self) -> &UserId {
        &self.itinerary.owner
    }
}

/// An itinerary stripped of its identity and ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicItinerary {
    pub title: String,
    pub destination: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    #[serde(default)]
    pub activities: Vec<Activity>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Frozen copy of an itinerary taken when a share link is created.
///
/// Snapshots live only in the cache and are never refreshed: later edits or
/// deletion of the source itinerary do not affect them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareSnapshot {
    pub itinerary_id: ItineraryId,
    pub data: PublicItinerary,
    pub created_at: Timestamp,
}

impl ShareSnapshot {
    pub fn capture(itinerary: &Itinerary, created_at: Timestamp) -> Self {
        Self {
            itinerary_id: itinerary.id.clone(),
            data: itinerary.to_public(),
            created_at,
        }
    }
}
