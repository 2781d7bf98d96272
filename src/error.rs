// Error handling module for the booking API
// Provides centralized error types and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::settings::SettingsError;
use crate::storage::StorageError;

/// Main error type for the catalog, seating, settings and upload handlers
///
/// Each variant maps to a specific HTTP status code and error response format.
/// Booking operations use `BookingError`, which renders the same body shape.
#[derive(Debug)]
pub enum ApiError {
    /// Validation errors from request validation
    /// Maps to HTTP 400 Bad Request
    ValidationError(validator::ValidationErrors),

    /// Malformed input that is not tied to a derive-validated field
    /// Maps to HTTP 400 Bad Request
    BadRequest { field: String, message: String },

    /// Resource not found by ID
    /// Maps to HTTP 404 Not Found
    NotFound { resource: String, id: String },

    /// Duplicate resource or guarded delete
    /// Maps to HTTP 409 Conflict
    Conflict { message: String },

    /// Database operation errors
    /// Sensitive details are filtered from client responses
    DatabaseError(sqlx::Error),

    /// Internal server errors
    /// Sensitive details are filtered from client responses
    InternalError(String),
}

/// Consistent error response structure
///
/// Shared by every error type in the crate so clients see one JSON shape:
/// a machine-readable `error_code`, a human-readable `message`, optional
/// field-level `details` and an RFC 3339 `timestamp`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR", "NOT_FOUND")
    pub error_code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (e.g., field-level validation errors)
    /// Omitted from JSON when None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// ISO 8601 timestamp of when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.to_string(),
            message: message.into(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Body for a single field error, keyed the way validator reports fields
    pub fn field_error(field: &str, message: &str) -> Self {
        Self::new("VALIDATION_ERROR", "Request validation failed")
            .with_details(serde_json::json!({ field: [message] }))
    }

    pub fn validation(errors: &validator::ValidationErrors) -> Self {
        Self::new("VALIDATION_ERROR", "Request validation failed")
            .with_details(serde_json::to_value(errors).unwrap_or(serde_json::json!({})))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.to_error_response();
        (status, Json(error_response)).into_response()
    }
}

impl ApiError {
    /// Convert ApiError to HTTP status code and ErrorResponse
    ///
    /// Logging levels follow severity: error! for 500s, warn! for conflicts,
    /// debug! for expected client errors.
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                (StatusCode::BAD_REQUEST, ErrorResponse::validation(errors))
            }
            ApiError::BadRequest { field, message } => {
                debug!("Bad request on {}: {}", field, message);
                (StatusCode::BAD_REQUEST, ErrorResponse::field_error(field, message))
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new("NOT_FOUND", format!("{} with id {} not found", resource, id)),
                )
            }
            ApiError::Conflict { message } => {
                warn!("Conflict error: {}", message);
                (StatusCode::CONFLICT, ErrorResponse::new("CONFLICT", message.clone()))
            }
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {:?}", db_error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("DATABASE_ERROR", "A database error occurred"),
                )
            }
            ApiError::InternalError(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("INTERNAL_ERROR", "An internal server error occurred"),
                )
            }
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::DatabaseError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        ApiError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    pub fn bad_request(field: &str, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Convert sqlx errors to ApiError
impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::DatabaseError(error)
    }
}

/// Convert validator errors to ApiError
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors)
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::UnsupportedType(content_type) => ApiError::bad_request(
                "file",
                format!("Unsupported file type: {}", content_type),
            ),
            StorageError::TooLarge { size, max } => ApiError::bad_request(
                "file",
                format!("File is {} bytes, the limit is {} bytes", size, max),
            ),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<SettingsError> for ApiError {
    fn from(error: SettingsError) -> Self {
        match error {
            SettingsError::UnknownKey(key) => ApiError::not_found("Setting", key),
            SettingsError::Database(e) => ApiError::DatabaseError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::{ValidationError, ValidationErrors};

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::ValidationError(ValidationErrors::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::not_found("Menu", 3).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Conflict { message: "x".into() }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::DatabaseError(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_details_are_field_level() {
        let mut errors = ValidationErrors::new();
        errors.add("name", ValidationError::new("length"));
        let body = ErrorResponse::validation(&errors);
        assert_eq!(body.error_code, "VALIDATION_ERROR");
        let details = body.details.unwrap();
        assert!(details.get("name").is_some());
    }

    #[test]
    fn test_database_error_hides_details() {
        let (status, body) = ApiError::DatabaseError(sqlx::Error::PoolTimedOut).to_error_response();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "A database error occurred");
        assert!(body.details.is_none());
    }

    #[test]
    fn test_storage_type_error_is_client_error() {
        let err: ApiError = StorageError::UnsupportedType("text/plain".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
