use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;
use validator::Validate;

use crate::bookings::CartTotals;

/// Booking status representing the lifecycle of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Label shown to staff and in exports
    pub fn label(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Menunggu Konfirmasi",
            BookingStatus::Confirmed => "Dikonfirmasi",
            BookingStatus::Cancelled => "Dibatalkan",
        }
    }
}

impl Default for BookingStatus {
    fn default() -> Self {
        BookingStatus::Pending
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(format!("Invalid booking status: {}", s)),
        }
    }
}

/// Recorded payment: deposit (`dp`) or paid in full (`lunas`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Dp,
    Lunas,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Dp => "dp",
            PaymentStatus::Lunas => "lunas",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::Dp => "DP",
            PaymentStatus::Lunas => "LUNAS",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain model representing a booking in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: i64,
    pub booking_code: String,
    pub customer_name: String,
    pub booking_date: NaiveDate,
    pub guest_count: i32,
    pub whatsapp: String,
    pub instagram: Option<String>,
    pub seating_spot_id: i64,
    pub alternative_seating_spot_id: Option<i64>,
    pub subtotal_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub dp_amount: Decimal,
    pub payment_proof: Option<String>,
    pub status: BookingStatus,
    pub payment_status: Option<PaymentStatus>,
    pub paid_amount: Option<Decimal>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Outstanding amount while only a deposit has been recorded
    pub fn remaining_balance(&self) -> Option<Decimal> {
        match self.payment_status {
            Some(PaymentStatus::Dp) => {
                Some(self.total_amount - self.paid_amount.unwrap_or(Decimal::ZERO))
            }
            _ => None,
        }
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals {
            subtotal: self.subtotal_amount,
            tax: self.tax_amount,
            total: self.total_amount,
            dp: self.dp_amount,
        }
    }

    pub fn apply_totals(&mut self, totals: CartTotals) {
        self.subtotal_amount = totals.subtotal;
        self.tax_amount = totals.tax;
        self.total_amount = totals.total;
        self.dp_amount = totals.dp;
    }
}

/// A price-locked line of a booking
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookingItem {
    pub id: i64,
    pub booking_id: i64,
    pub menu_id: i64,
    /// Menu name at read time, None if the menu row is gone
    pub menu_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    /// Variant name -> option name, for display only
    pub selected_options: Json<BTreeMap<String, String>>,
}

impl BookingItem {
    /// "Dada, Pedas" style summary of the chosen options
    pub fn options_text(&self) -> Option<String> {
        if self.selected_options.0.is_empty() {
            None
        } else {
            Some(
                self.selected_options
                    .0
                    .values()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        }
    }
}

/// Booking row to be inserted
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub booking_code: String,
    pub customer_name: String,
    pub booking_date: NaiveDate,
    pub guest_count: i32,
    pub whatsapp: String,
    pub instagram: Option<String>,
    pub seating_spot_id: i64,
    pub alternative_seating_spot_id: Option<i64>,
    pub totals: CartTotals,
    pub payment_proof: String,
    pub notes: Option<String>,
}

/// Booking item to be inserted, with its unit price already frozen
#[derive(Debug, Clone, PartialEq)]
pub struct NewBookingItem {
    pub menu_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub selected_options: BTreeMap<String, String>,
}

/// Capacity check performed inside the insert transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityGuard {
    pub spot_id: i64,
    pub capacity: i32,
    pub booking_date: NaiveDate,
    pub guests: i32,
}

/// One line of a customer cart: a menu, a quantity and chosen options
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CartLineRequest {
    pub menu_id: i64,
    #[validate(range(min = 1, max = 1000, message = "Quantity must be between 1 and 1000"))]
    pub quantity: i32,
    /// Variant id -> option id
    #[serde(default)]
    pub selections: BTreeMap<i64, i64>,
}

/// Request DTO for creating a booking
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBookingRequest {
    #[validate(
        length(min = 1, max = 255, message = "Name is required"),
        custom = "crate::validation::validate_not_blank"
    )]
    pub customer_name: String,
    pub booking_date: NaiveDate,
    #[validate(range(min = 1, max = 500, message = "Guest count must be between 1 and 500"))]
    pub guest_count: i32,
    #[validate(custom = "crate::validation::validate_whatsapp_local")]
    pub whatsapp: String,
    #[validate(length(max = 255))]
    pub instagram: Option<String>,
    pub seating_spot_id: i64,
    pub alternative_seating_spot_id: Option<i64>,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    #[validate]
    pub items: Vec<CartLineRequest>,
    #[validate(length(min = 1, message = "Proof of payment is required"))]
    pub payment_proof: String,
    pub notes: Option<String>,
}

/// Request DTO for pricing a cart without booking it
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuoteRequest {
    #[validate(length(min = 1, message = "Cart must contain at least one item"))]
    #[validate]
    pub items: Vec<CartLineRequest>,
}

/// Request DTO for confirming a booking or correcting its payment
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaymentRequest {
    pub payment_status: PaymentStatus,
    pub paid_amount: Decimal,
}

/// Request DTO for cancelling a booking
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CancelRequest {
    #[validate(length(min = 5, message = "Cancellation reason must be at least 5 characters"))]
    pub reason: String,
}

/// Request DTO for editing the customer-facing details of a booking
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateDetailsRequest {
    #[validate(
        length(min = 1, max = 255, message = "Name is required"),
        custom = "crate::validation::validate_not_blank"
    )]
    pub customer_name: String,
    pub booking_date: NaiveDate,
    #[validate(range(min = 1, max = 500, message = "Guest count must be between 1 and 500"))]
    pub guest_count: i32,
    #[validate(custom = "crate::validation::validate_whatsapp_local")]
    pub whatsapp: String,
    #[validate(length(max = 255))]
    pub instagram: Option<String>,
    pub seating_spot_id: i64,
    pub alternative_seating_spot_id: Option<i64>,
    pub notes: Option<String>,
}

/// Request DTO for editing the items of a booking
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct EditItemsRequest {
    #[serde(default)]
    #[validate]
    pub added: Vec<CartLineRequest>,
    #[serde(default)]
    pub removed_item_ids: Vec<i64>,
    /// Item id -> new quantity; zero or less removes the item
    #[serde(default)]
    pub quantity_changes: BTreeMap<i64, i32>,
}

/// Request DTO for replacing the proof-of-payment reference
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReplaceProofRequest {
    #[validate(length(min = 1, message = "Proof of payment is required"))]
    pub payment_proof: String,
}

/// Booking with its items and display fields
#[derive(Debug, Clone, Serialize)]
pub struct BookingResponse {
    #[serde(flatten)]
    pub booking: Booking,
    pub items: Vec<BookingItem>,
    pub seating_spot_name: Option<String>,
    pub alternative_seating_spot_name: Option<String>,
    pub remaining_balance: Option<Decimal>,
    pub payment_proof_url: Option<String>,
}

/// Booking plus the WhatsApp deep link to send its message
#[derive(Debug, Clone, Serialize)]
pub struct BookingWithLink {
    pub booking: BookingResponse,
    pub whatsapp_url: String,
}

/// One priced line of a quote
#[derive(Debug, Clone, Serialize)]
pub struct QuotedLine {
    pub menu_id: i64,
    pub menu_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub selected_options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub lines: Vec<QuotedLine>,
    pub totals: CartTotals,
}

/// One page of bookings
#[derive(Debug, Clone, Serialize)]
pub struct BookingPage {
    pub data: Vec<BookingResponse>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
}

/// Aggregated booking counts for the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BookingCounts {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub today: i64,
    /// Sum of totals over confirmed bookings
    pub confirmed_revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    #[serde(flatten)]
    pub bookings: BookingCounts,
    pub menus: i64,
    pub categories: i64,
    pub today: NaiveDate,
    /// Same-day booking cutoff has passed
    pub past_cutoff: bool,
    pub today_force_open: bool,
}

/// Portions of one menu needed for a day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuTally {
    pub menu_id: i64,
    pub menu_name: String,
    pub quantity: i64,
}

/// Kitchen view of one day
#[derive(Debug, Clone, Serialize)]
pub struct KitchenSummary {
    pub date: NaiveDate,
    pub total_bookings: usize,
    pub total_pax: i64,
    pub menu_summary: Vec<MenuTally>,
    pub bookings: Vec<BookingResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_booking() -> Booking {
        Booking {
            id: 1,
            booking_code: "BK20260315AB12".to_string(),
            customer_name: "Siti".to_string(),
            booking_date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
            guest_count: 4,
            whatsapp: "6281234567890".to_string(),
            instagram: None,
            seating_spot_id: 1,
            alternative_seating_spot_id: None,
            subtotal_amount: dec!(100000),
            tax_amount: dec!(10000),
            total_amount: dec!(110000),
            dp_amount: dec!(55000),
            payment_proof: Some("payments/proof.jpg".to_string()),
            status: BookingStatus::Pending,
            payment_status: None,
            paid_amount: None,
            confirmed_at: None,
            cancellation_reason: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_remaining_balance_only_for_dp() {
        let mut booking = sample_booking();
        assert_eq!(booking.remaining_balance(), None);

        booking.payment_status = Some(PaymentStatus::Dp);
        booking.paid_amount = Some(dec!(55000));
        assert_eq!(booking.remaining_balance(), Some(dec!(55000)));

        booking.payment_status = Some(PaymentStatus::Lunas);
        booking.paid_amount = Some(dec!(110000));
        assert_eq!(booking.remaining_balance(), None);
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(serde_json::to_string(&BookingStatus::Cancelled).unwrap(), "\"cancelled\"");
        assert_eq!(serde_json::to_string(&PaymentStatus::Lunas).unwrap(), "\"lunas\"");
        let parsed: PaymentStatus = serde_json::from_str("\"dp\"").unwrap();
        assert_eq!(parsed, PaymentStatus::Dp);
        assert_eq!("Confirmed".parse::<BookingStatus>(), Ok(BookingStatus::Confirmed));
    }

    #[test]
    fn test_cart_line_selections_from_json() {
        let line: CartLineRequest =
            serde_json::from_str(r#"{"menu_id": 3, "quantity": 2, "selections": {"7": 21}}"#).unwrap();
        assert_eq!(line.selections.get(&7), Some(&21));

        let bare: CartLineRequest = serde_json::from_str(r#"{"menu_id": 3, "quantity": 1}"#).unwrap();
        assert!(bare.selections.is_empty());
    }

    #[test]
    fn test_create_request_validation() {
        let request = CreateBookingRequest {
            customer_name: " ".to_string(),
            booking_date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
            guest_count: 0,
            whatsapp: "12345".to_string(),
            instagram: None,
            seating_spot_id: 1,
            alternative_seating_spot_id: None,
            items: vec![],
            payment_proof: String::new(),
            notes: None,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        for field in ["customer_name", "guest_count", "whatsapp", "items", "payment_proof"] {
            assert!(fields.contains_key(field), "missing error for {}", field);
        }
    }
}
