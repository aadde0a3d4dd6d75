mod health;
mod itinerary;
mod share;

pub use health::health_handler;
pub use itinerary::{
    create_itinerary_handler, delete_itinerary_handler, get_itinerary_handler,
    list_itineraries_handler, update_itinerary_handler,
};
pub use share::{create_share_handler, resolve_share_handler};

use crate::error::ApiError;
use itinera_core::ItineraryId;
use itinera_service::FieldError;

pub async fn not_found_handler() -> ApiError {
    ApiError::route_not_found()
}

fn parse_id(raw: &str) -> Result<ItineraryId, ApiError> {
    ItineraryId::new(raw)
        .map_err(|_| ApiError::validation(vec![FieldError::new("id", "Invalid itinerary ID")]))
}
