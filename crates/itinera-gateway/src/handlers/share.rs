use super::parse_id;
use crate::auth::AuthUser;
use crate::error::{ApiError, Result};
use crate::model::Envelope;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use itinera_service::{ShareLink, SharedItinerary};

pub async fn create_share_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Envelope<ShareLink>>> {
    let id = parse_id(&id)?;
    let base_url = state.base_url(&headers);

    let link = state
        .service()
        .share(&id, &user, &base_url)
        .await
        .map_err(state.failure("Failed to create shareable link"))?;

    Ok(Json(Envelope::with_data(
        "Shareable link created successfully",
        link,
    )))
}

/// Public: no authentication.
pub async fn resolve_share_handler(
    State(state): State<AppState>,
    Path(shareable_id): Path<String>,
) -> Result<Json<Envelope<SharedItinerary>>> {
    let shared = state
        .service()
        .resolve_share(&shareable_id)
        .await
        .ok_or_else(|| ApiError::not_found("Shareable link not found or expired"))?;

    Ok(Json(Envelope::with_data(
        "Shareable itinerary retrieved successfully",
        shared,
    )))
}
