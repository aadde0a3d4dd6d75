//! The cache key space.
//!
//! Two namespaces share the cache: `itinerary:<id>` holds cached itinerary
//! views and `shareable:<token>` holds share snapshots. Invalidation only
//! ever targets the first.

use crate::id::{ItineraryId, ShareableId};

pub const ITINERARY_KEY_PREFIX: &str = "itinerary:";
pub const SHAREABLE_KEY_PREFIX: &str = "shareable:";

pub fn itinerary_key(id: &ItineraryId) -> String {
    format!("{ITINERARY_KEY_PREFIX}{id}")
}

pub fn shareable_key(id: &ShareableId) -> String {
    format!("{SHAREABLE_KEY_PREFIX}{id}")
}
