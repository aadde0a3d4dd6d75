use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    create_itinerary_handler, create_share_handler, delete_itinerary_handler,
    get_itinerary_handler, health_handler, list_itineraries_handler, not_found_handler,
    resolve_share_handler, update_itinerary_handler,
};
use crate::state::AppState;

/// Maximum accepted request body.
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route(
                "/api/itineraries",
                post(create_itinerary_handler).get(list_itineraries_handler),
            )
            .route(
                "/api/itineraries/share/{shareable_id}",
                get(resolve_share_handler),
            )
            .route(
                "/api/itineraries/{id}",
                get(get_itinerary_handler)
                    .put(update_itinerary_handler)
                    .delete(delete_itinerary_handler),
            )
            .route("/api/itineraries/{id}/share", post(create_share_handler))
            .fallback(not_found_handler)
            .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
