// HTTP handlers for booking endpoints

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::bookings::{
    BookingError, BookingListParams, BookingPage, BookingResponse, BookingStatus, BookingWithLink,
    CancelRequest, CreateBookingRequest, DashboardStats, EditItemsRequest, ExportParams,
    KitchenSummary, PaymentRequest, QueryValidator, Quote, QuoteRequest, ReplaceProofRequest,
    UpdateDetailsRequest,
};
use crate::export::{exporter_for, BookingExportRow};

/// Query parameters of the kitchen summary
#[derive(Debug, Deserialize)]
pub struct KitchenQuery {
    /// Defaults to today
    pub date: Option<NaiveDate>,
    pub status: Option<String>,
}

/// Handler for POST /api/booking/quote
pub async fn quote_handler(
    State(state): State<crate::AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<Quote>, BookingError> {
    Ok(Json(state.bookings.quote(&request).await?))
}

/// Handler for POST /api/bookings
/// Creates a pending booking and returns the WhatsApp link to the cafe
pub async fn create_booking_handler(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingWithLink>), BookingError> {
    let created = state.bookings.create(&request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Handler for GET /api/bookings/code/:code
pub async fn booking_by_code_handler(
    State(state): State<crate::AppState>,
    Path(code): Path<String>,
) -> Result<Json<BookingResponse>, BookingError> {
    Ok(Json(state.bookings.find_by_code(&code).await?))
}

/// Handler for GET /api/admin/bookings
pub async fn list_bookings_handler(
    State(state): State<crate::AppState>,
    Query(params): Query<BookingListParams>,
) -> Result<Json<BookingPage>, BookingError> {
    let request = QueryValidator::validate_list(params)?;
    tracing::debug!("Listing bookings with {:?}", request.filter);
    Ok(Json(state.bookings.list(&request).await?))
}

/// Handler for GET /api/admin/bookings/:id
pub async fn get_booking_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BookingResponse>, BookingError> {
    Ok(Json(state.bookings.get(id).await?))
}

/// Handler for POST /api/admin/bookings/:id/confirm
/// Returns the WhatsApp link to notify the customer
pub async fn confirm_booking_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
    Json(request): Json<PaymentRequest>,
) -> Result<Json<BookingWithLink>, BookingError> {
    Ok(Json(state.bookings.confirm(id, &request).await?))
}

/// Handler for POST /api/admin/bookings/:id/cancel
pub async fn cancel_booking_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<BookingResponse>, BookingError> {
    Ok(Json(state.bookings.cancel(id, &request).await?))
}

/// Handler for PUT /api/admin/bookings/:id/payment
pub async fn update_payment_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
    Json(request): Json<PaymentRequest>,
) -> Result<Json<BookingResponse>, BookingError> {
    Ok(Json(state.bookings.update_payment(id, &request).await?))
}

/// Handler for PUT /api/admin/bookings/:id
pub async fn update_details_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateDetailsRequest>,
) -> Result<Json<BookingResponse>, BookingError> {
    Ok(Json(state.bookings.update_details(id, &request).await?))
}

/// Handler for PUT /api/admin/bookings/:id/items
pub async fn edit_items_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
    Json(request): Json<EditItemsRequest>,
) -> Result<Json<BookingResponse>, BookingError> {
    Ok(Json(state.bookings.edit_items(id, &request).await?))
}

/// Handler for POST /api/admin/bookings/:id/recalculate
pub async fn recalculate_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BookingResponse>, BookingError> {
    Ok(Json(state.bookings.recalculate_totals(id).await?))
}

/// Handler for PUT /api/admin/bookings/:id/payment-proof
pub async fn replace_proof_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ReplaceProofRequest>,
) -> Result<Json<BookingResponse>, BookingError> {
    Ok(Json(state.bookings.replace_payment_proof(id, &request).await?))
}

/// Handler for DELETE /api/admin/bookings/:id
pub async fn delete_booking_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, BookingError> {
    state.bookings.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/admin/bookings/export
/// `?format=csv` (default) or `?format=json`
pub async fn export_bookings_handler(
    State(state): State<crate::AppState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, BookingError> {
    let exporter = exporter_for(params.format.as_deref(), state.config.booking.tax_rate)?;
    let filter = QueryValidator::validate_export(&params)?;

    let rows: Vec<BookingExportRow> = state
        .bookings
        .export(&filter)
        .await?
        .iter()
        .map(BookingExportRow::from_response)
        .collect();
    let body = exporter.render(&rows)?;

    let filename = format!(
        "bookings-{}.{}",
        state.availability.today().format("%Y%m%d"),
        exporter.file_extension()
    );
    tracing::info!("Exported {} bookings as {}", rows.len(), filename);

    Ok((
        [
            (header::CONTENT_TYPE, exporter.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}

/// Handler for GET /api/admin/bookings/kitchen
/// Portions to prepare and bookings expected on a day
pub async fn kitchen_summary_handler(
    State(state): State<crate::AppState>,
    Query(query): Query<KitchenQuery>,
) -> Result<Json<KitchenSummary>, BookingError> {
    let date = query.date.unwrap_or_else(|| state.availability.today());
    let status = match QueryValidator::normalize_string(query.status) {
        None => None,
        Some(s) if s.eq_ignore_ascii_case("all") => None,
        Some(s) => Some(
            s.parse::<BookingStatus>()
                .map_err(|message| BookingError::invalid("status", message))?,
        ),
    };
    Ok(Json(state.bookings.kitchen_summary(date, status).await?))
}

/// Handler for GET /api/admin/dashboard
pub async fn dashboard_handler(
    State(state): State<crate::AppState>,
) -> Result<Json<DashboardStats>, BookingError> {
    Ok(Json(state.bookings.dashboard_stats().await?))
}
