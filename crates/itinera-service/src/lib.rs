//! The itinerary service: read-through caching, invalidation on write,
//! shareable snapshots, and the operations built on top of them.

pub mod error;
pub mod generator;
pub mod invalidation;
pub mod read_through;
pub mod service;
pub mod share;
pub mod store;
pub mod validation;

#[cfg(test)]
mod testing;

pub use error::{Result, ServiceError};
pub use generator::{Generator, RandomTokenGenerator};
pub use invalidation::CacheInvalidator;
pub use read_through::{CacheHitPolicy, CachedItineraries};
pub use service::{
    ItineraryService, Listing, ServiceSettings, ShareLink, SharedItinerary, DEFAULT_STORE_TIMEOUT,
    SHARE_EXPIRES_IN,
};
pub use share::{ShareStore, ShareUnavailable};
pub use store::TimedRepository;
pub use validation::{ActivityInput, FieldError, ItineraryInput, ListParams};
