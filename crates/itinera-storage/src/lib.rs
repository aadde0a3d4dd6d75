//! Persistent store implementations for itineraries.

pub mod memory;
pub mod mysql;

pub use itinera_core::repository::{
    ItineraryRepository, ListQuery, Page, PatchOutcome, Result, SortField,
};
pub use itinera_core::{ItineraryPatch, StorageError};
pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
