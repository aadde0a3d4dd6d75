use itinera_core::Itinerary;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ItineraryData {
    pub itinerary: Itinerary,
}
