use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Per-date override; a date without a row is open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BookingDate {
    pub id: i64,
    pub date: NaiveDate,
    /// Explicit admin closure when false
    pub is_open: bool,
    /// Opens the date even past the same-day cutoff
    pub force_open: bool,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// Request DTO for creating or replacing a date override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpsertBookingDate {
    pub date: NaiveDate,
    #[serde(default = "default_true")]
    pub is_open: bool,
    #[serde(default)]
    pub force_open: bool,
    #[validate(length(max = 255))]
    pub note: Option<String>,
}

/// Query parameters for listing overrides
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Answer to "is this date bookable right now?"
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateAvailability {
    pub date: String,
    pub available: bool,
}

/// Booking terms exposed to the booking form
#[derive(Debug, Clone, Serialize)]
pub struct BookingTerms {
    pub tax_rate: Decimal,
    pub dp_percentage: Decimal,
    pub cutoff_hour: u32,
    pub booking_rules: Vec<String>,
    pub today: NaiveDate,
    pub past_cutoff: bool,
}
