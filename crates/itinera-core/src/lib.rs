//! Core types and traits for the Itinera itinerary backend.
//!
//! This crate holds the domain model shared by the cache, storage, service
//! and gateway crates, together with the two ports everything else plugs
//! into: [`ItineraryRepository`] for the persistent store and [`KvCache`]
//! for the ephemeral key-value cache.

pub mod cache;
pub mod clock;
pub mod error;
pub mod id;
pub mod itinerary;
pub mod keys;
pub mod repository;

pub use cache::{CacheOutcome, KvCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, IdError, StorageError};
pub use id::{ItineraryId, ShareableId, UserId};
pub use itinerary::{
    Activity, Itinerary, ItineraryPatch, ItineraryView, PublicItinerary, ShareSnapshot,
};
pub use repository::{ItineraryRepository, ListQuery, Page, PatchOutcome, SortField};
