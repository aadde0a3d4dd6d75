//! The ephemeral key-value cache used by the itinerary service.
//!
//! [`CacheClient`] is the handle the rest of the system holds. It wraps any
//! [`KvCache`] backend, adds typed (de)serialization and a per-call timeout,
//! and turns every backend failure into [`CacheOutcome::Degraded`].

pub mod client;
pub mod memory;
pub mod redis;

pub use client::{CacheClient, DEFAULT_OPERATION_TIMEOUT};
pub use itinera_core::{CacheError, CacheOutcome, KvCache};
pub use memory::MemoryKvCache;
pub use crate::redis::RedisKvCache;
