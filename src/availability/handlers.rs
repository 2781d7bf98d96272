// HTTP handlers for booking date endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use validator::Validate;

use crate::availability::{
    BookingDate, BookingTerms, DateAvailability, DateRangeQuery, UpsertBookingDate,
    AVAILABLE_DATES_HORIZON,
};
use crate::error::ApiError;

/// Handler for GET /api/booking/config
pub async fn booking_terms_handler(
    State(state): State<crate::AppState>,
) -> Json<BookingTerms> {
    let booking = &state.config.booking;
    Json(BookingTerms {
        tax_rate: booking.tax_rate,
        dp_percentage: booking.dp_percentage,
        cutoff_hour: booking.cutoff_hour,
        booking_rules: booking.booking_rules.clone(),
        today: state.availability.today(),
        past_cutoff: state.availability.is_past_cutoff(),
    })
}

/// Handler for GET /api/booking/available-dates
pub async fn available_dates_handler(
    State(state): State<crate::AppState>,
) -> Result<Json<Vec<NaiveDate>>, ApiError> {
    let dates = state
        .availability
        .available_dates(AVAILABLE_DATES_HORIZON)
        .await?;
    Ok(Json(dates))
}

/// Handler for GET /api/booking/dates/:date/availability
pub async fn date_availability_handler(
    State(state): State<crate::AppState>,
    Path(date): Path<String>,
) -> Result<Json<DateAvailability>, ApiError> {
    let available = state.availability.is_available_str(&date).await?;
    Ok(Json(DateAvailability { date, available }))
}

/// Handler for GET /api/admin/dates
pub async fn list_dates_handler(
    State(state): State<crate::AppState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<BookingDate>>, ApiError> {
    let dates = state.availability.list_dates(query.from, query.to).await?;
    Ok(Json(dates))
}

/// Handler for PUT /api/admin/dates
pub async fn upsert_date_handler(
    State(state): State<crate::AppState>,
    Json(payload): Json<UpsertBookingDate>,
) -> Result<Json<BookingDate>, ApiError> {
    payload.validate()?;
    let record = state.availability.set_date(&payload).await?;
    Ok(Json(record))
}

/// Handler for DELETE /api/admin/dates/:date
pub async fn delete_date_handler(
    State(state): State<crate::AppState>,
    Path(date): Path<NaiveDate>,
) -> Result<StatusCode, ApiError> {
    if state.availability.delete_date(date).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Booking date", date))
    }
}

/// Handler for POST /api/admin/dates/force-open-today
pub async fn force_open_today_handler(
    State(state): State<crate::AppState>,
) -> Result<Json<BookingDate>, ApiError> {
    Ok(Json(state.availability.force_open_today().await?))
}

/// Handler for POST /api/admin/dates/close-today
pub async fn close_today_handler(
    State(state): State<crate::AppState>,
) -> Result<Json<BookingDate>, ApiError> {
    Ok(Json(state.availability.close_today().await?))
}
