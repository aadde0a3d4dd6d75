use super::parse_id;
use crate::auth::AuthUser;
use crate::error::{ApiError, Result};
use crate::model::{Envelope, ItineraryData, PageMeta};
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use itinera_core::Itinerary;
use itinera_service::{FieldError, ItineraryInput, ListParams};

type Body<T> = std::result::Result<Json<T>, JsonRejection>;

fn input(body: Body<ItineraryInput>) -> Result<ItineraryInput> {
    body.map(|Json(input)| input).map_err(|rejection| {
        ApiError::validation(vec![FieldError::new("body", rejection.body_text())])
    })
}

pub async fn create_itinerary_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Body<ItineraryInput>,
) -> Result<(StatusCode, Json<Envelope<ItineraryData>>)> {
    let itinerary = state
        .service()
        .create(&user, input(body)?)
        .await
        .map_err(state.failure("Failed to create itinerary"))?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_data(
            "Itinerary created successfully",
            ItineraryData { itinerary },
        )),
    ))
}

pub async fn list_itineraries_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Envelope<Vec<Itinerary>>>> {
    let Query(params) = query.map_err(|rejection| {
        ApiError::validation(vec![FieldError::new("query", rejection.body_text())])
    })?;

    let listing = state
        .service()
        .list(&user, params)
        .await
        .map_err(state.failure("Failed to get itineraries"))?;

    let meta = PageMeta {
        page: listing.page,
        limit: listing.limit,
        total: listing.total,
        pages: listing.pages,
    };
    Ok(Json(
        Envelope::with_data("Itineraries retrieved successfully", listing.items).with_meta(meta),
    ))
}

pub async fn get_itinerary_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Envelope<ItineraryData>>> {
    let id = parse_id(&id)?;
    let view = state
        .service()
        .get(&id, &user)
        .await
        .map_err(state.failure("Failed to get itinerary"))?;

    Ok(Json(Envelope::with_data(
        "Itinerary retrieved successfully",
        ItineraryData {
            itinerary: view.itinerary,
        },
    )))
}

pub async fn update_itinerary_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    body: Body<ItineraryInput>,
) -> Result<Json<Envelope<ItineraryData>>> {
    let id = parse_id(&id)?;
    let itinerary = state
        .service()
        .update(&id, &user, input(body)?)
        .await
        .map_err(state.failure("Failed to update itinerary"))?;

    Ok(Json(Envelope::with_data(
        "Itinerary updated successfully",
        ItineraryData { itinerary },
    )))
}

pub async fn delete_itinerary_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Envelope<()>>> {
    let id = parse_id(&id)?;
    state
        .service()
        .delete(&id, &user)
        .await
        .map_err(state.failure("Failed to delete itinerary"))?;

    Ok(Json(Envelope::message("Itinerary deleted successfully")))
}
