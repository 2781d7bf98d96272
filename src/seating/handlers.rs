// HTTP handlers for seating spot endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::error::ApiError;
use crate::seating::{CreateSeatingSpot, SeatingSpot, SpotDirectory, SpotQuery, UpdateSeatingSpot};

/// Handler for GET /api/seating-spots
#[utoipa::path(
    get,
    path = "/api/seating-spots",
    responses((status = 200, description = "Active seating spots", body = Vec<SeatingSpot>)),
    tag = "seating"
)]
pub async fn active_spots_handler(
    State(state): State<crate::AppState>,
) -> Result<Json<Vec<SeatingSpot>>, ApiError> {
    let spots = state.seating.list_spots(true).await?;
    tracing::debug!("Retrieved {} active seating spots", spots.len());
    Ok(Json(spots))
}

/// Handler for GET /api/admin/seating-spots
#[utoipa::path(
    get,
    path = "/api/admin/seating-spots",
    params(("search" = Option<String>, Query, description = "Name filter")),
    responses((status = 200, description = "All seating spots", body = Vec<SeatingSpot>)),
    tag = "seating"
)]
pub async fn list_spots_handler(
    State(state): State<crate::AppState>,
    Query(query): Query<SpotQuery>,
) -> Result<Json<Vec<SeatingSpot>>, ApiError> {
    Ok(Json(state.seating.search(query.search.as_deref()).await?))
}

/// Handler for GET /api/admin/seating-spots/:id
#[utoipa::path(
    get,
    path = "/api/admin/seating-spots/{id}",
    params(("id" = i64, Path, description = "Seating spot ID")),
    responses(
        (status = 200, description = "Seating spot found", body = SeatingSpot),
        (status = 404, description = "Seating spot not found")
    ),
    tag = "seating"
)]
pub async fn get_spot_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SeatingSpot>, ApiError> {
    Ok(Json(state.seating.get(id).await?))
}

/// Handler for POST /api/admin/seating-spots
#[utoipa::path(
    post,
    path = "/api/admin/seating-spots",
    request_body = CreateSeatingSpot,
    responses(
        (status = 201, description = "Seating spot created", body = SeatingSpot),
        (status = 400, description = "Invalid input data")
    ),
    tag = "seating"
)]
pub async fn create_spot_handler(
    State(state): State<crate::AppState>,
    Json(payload): Json<CreateSeatingSpot>,
) -> Result<(StatusCode, Json<SeatingSpot>), ApiError> {
    payload.validate()?;
    let spot = state.seating.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(spot)))
}

/// Handler for PUT /api/admin/seating-spots/:id
#[utoipa::path(
    put,
    path = "/api/admin/seating-spots/{id}",
    params(("id" = i64, Path, description = "Seating spot ID")),
    request_body = UpdateSeatingSpot,
    responses(
        (status = 200, description = "Seating spot updated", body = SeatingSpot),
        (status = 404, description = "Seating spot not found")
    ),
    tag = "seating"
)]
pub async fn update_spot_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSeatingSpot>,
) -> Result<Json<SeatingSpot>, ApiError> {
    payload.validate()?;
    Ok(Json(state.seating.update(id, &payload).await?))
}

/// Handler for DELETE /api/admin/seating-spots/:id
#[utoipa::path(
    delete,
    path = "/api/admin/seating-spots/{id}",
    params(("id" = i64, Path, description = "Seating spot ID")),
    responses(
        (status = 204, description = "Seating spot deleted"),
        (status = 404, description = "Seating spot not found"),
        (status = 409, description = "Seating spot is used by bookings")
    ),
    tag = "seating"
)]
pub async fn delete_spot_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if let Some(image) = state.seating.delete(id).await? {
        if let Err(e) = state.storage.delete(&image).await {
            tracing::warn!("Seating spot {} deleted but its image {} was not: {}", id, image, e);
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
