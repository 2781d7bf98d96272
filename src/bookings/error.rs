use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use validator::ValidationErrors;

use crate::bookings::PricingError;
use crate::catalog::SelectionError;
use crate::error::ErrorResponse;
use crate::export::ExportError;
use crate::settings::SettingsError;
use crate::storage::StorageError;

/// Error types for booking operations
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("{message}")]
    InvalidInput { field: String, message: String },

    #[error("Booking date {0} is not available")]
    DateUnavailable(NaiveDate),

    #[error("Seating spot {spot_id} is full on {date}: {booked} of {capacity} seats taken")]
    SpotFull {
        spot_id: i64,
        date: NaiveDate,
        capacity: i32,
        booked: i64,
    },

    #[error("{0}")]
    InvalidState(String),

    #[error("{resource} with id {id} not found")]
    NotFound { resource: String, id: String },

    #[error("Booking code already taken")]
    DuplicateCode,

    #[error("Could not generate a unique booking code after {0} attempts")]
    CodeExhausted(u32),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl BookingError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        BookingError::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        BookingError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::Validation(_) | BookingError::InvalidInput { .. } => {
                StatusCode::BAD_REQUEST
            }
            BookingError::DateUnavailable(_)
            | BookingError::SpotFull { .. }
            | BookingError::InvalidState(_) => StatusCode::CONFLICT,
            BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BookingError::DuplicateCode
            | BookingError::CodeExhausted(_)
            | BookingError::Storage(_)
            | BookingError::Export(_)
            | BookingError::Settings(_)
            | BookingError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        match self {
            BookingError::Validation(errors) => {
                tracing::debug!("Booking validation error: {:?}", errors);
                ErrorResponse::validation(errors)
            }
            BookingError::InvalidInput { field, message } => {
                tracing::debug!("Invalid booking input on {}: {}", field, message);
                ErrorResponse::field_error(field, message)
            }
            BookingError::DateUnavailable(date) => {
                tracing::warn!("Booking refused, date {} unavailable", date);
                ErrorResponse::new("DATE_UNAVAILABLE", self.to_string())
                    .with_details(serde_json::json!({ "booking_date": date }))
            }
            BookingError::SpotFull { spot_id, capacity, booked, .. } => {
                tracing::warn!("{}", self);
                ErrorResponse::new("SPOT_FULL", self.to_string()).with_details(serde_json::json!({
                    "seating_spot_id": spot_id,
                    "capacity": capacity,
                    "booked": booked,
                }))
            }
            BookingError::InvalidState(message) => {
                tracing::warn!("Booking state conflict: {}", message);
                ErrorResponse::new("INVALID_STATE", message.clone())
            }
            BookingError::NotFound { .. } => {
                tracing::debug!("{}", self);
                ErrorResponse::new("NOT_FOUND", self.to_string())
            }
            other => {
                tracing::error!("Booking persistence error: {:?}", other);
                ErrorResponse::new("PERSISTENCE_ERROR", "An internal server error occurred")
            }
        }
    }
}

impl From<SelectionError> for BookingError {
    fn from(error: SelectionError) -> Self {
        BookingError::invalid("items", error.to_string())
    }
}

impl From<PricingError> for BookingError {
    fn from(error: PricingError) -> Self {
        BookingError::invalid("items", error.to_string())
    }
}

impl From<ExportError> for BookingError {
    fn from(error: ExportError) -> Self {
        match error {
            ExportError::UnsupportedFormat(_) => BookingError::invalid("format", error.to_string()),
            other => BookingError::Export(other.to_string()),
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let body = self.to_error_response();
        (self.status_code(), Json(body)).into_response()
    }
}
