mod envelope;
mod health;
mod itinerary;

pub use envelope::{Envelope, PageMeta};
pub use health::HealthResponse;
pub use itinerary::ItineraryData;
