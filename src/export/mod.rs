//! Tabular booking export
//!
//! Bookings are flattened into [`BookingExportRow`]s with display-ready cells
//! and handed to a [`TabularExporter`]. Embedding proof images is left to
//! whatever spreadsheet tool opens the file; rows carry the public URL.

use rust_decimal::Decimal;
use serde::Serialize;
use std::borrow::Cow;

use crate::bookings::{BookingResponse, PaymentStatus};
use crate::notification::{format_booking_date, format_rupiah};

/// Column titles in cell order; the tax column names the configured rate
pub fn export_headers(tax_rate: Decimal) -> Vec<String> {
    [
        "Kode Booking",
        "Nama Pelanggan",
        "Tanggal",
        "Jumlah Tamu",
        "WhatsApp",
        "Instagram",
        "Spot Duduk",
        "Pesanan",
        "Subtotal",
    ]
    .into_iter()
    .map(String::from)
    .chain(std::iter::once(format!("PPN ({}%)", tax_rate.normalize())))
    .chain(
        [
            "Total",
            "DP (Bukti)",
            "Status Booking",
            "Alasan Pembatalan",
            "Status Pembayaran",
            "Nominal Dibayar",
            "Sisa Pembayaran",
            "Catatan",
            "Dibuat",
            "Bukti Transfer",
        ]
        .into_iter()
        .map(String::from),
    )
    .collect()
}

/// One exported booking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingExportRow {
    pub booking_code: String,
    pub customer_name: String,
    pub booking_date: String,
    pub guest_count: i32,
    pub whatsapp: String,
    pub instagram: String,
    pub seating_spot: String,
    pub order: String,
    pub subtotal: String,
    pub tax: String,
    pub total: String,
    pub dp_amount: String,
    pub status: String,
    pub cancellation_reason: String,
    pub payment_status: String,
    pub paid_amount: String,
    pub remaining: String,
    pub notes: String,
    pub created_at: String,
    pub payment_proof_url: String,
}

fn or_dash(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

impl BookingExportRow {
    pub fn from_response(response: &BookingResponse) -> Self {
        let b = &response.booking;

        let order = response
            .items
            .iter()
            .map(|item| {
                let name = item.menu_name.as_deref().unwrap_or("-");
                match item.options_text() {
                    Some(options) => format!("{} ({}) x{}", name, options, item.quantity),
                    None => format!("{} x{}", name, item.quantity),
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        let seating_spot = match (
            response.seating_spot_name.as_deref(),
            response.alternative_seating_spot_name.as_deref(),
        ) {
            (Some(main), Some(alt)) => format!("{} (alt: {})", main, alt),
            (main, _) => or_dash(main),
        };

        Self {
            booking_code: b.booking_code.clone(),
            customer_name: b.customer_name.clone(),
            booking_date: format_booking_date(b.booking_date),
            guest_count: b.guest_count,
            whatsapp: b.whatsapp.clone(),
            instagram: or_dash(b.instagram.as_deref()),
            seating_spot,
            order,
            subtotal: format_rupiah(b.subtotal_amount),
            tax: format_rupiah(b.tax_amount),
            total: format_rupiah(b.total_amount),
            dp_amount: format_rupiah(b.dp_amount),
            status: b.status.label().to_string(),
            cancellation_reason: or_dash(b.cancellation_reason.as_deref()),
            payment_status: b
                .payment_status
                .map(|p| p.label().to_string())
                .unwrap_or_else(|| "-".to_string()),
            paid_amount: b
                .paid_amount
                .map(format_rupiah)
                .unwrap_or_else(|| "-".to_string()),
            remaining: match b.payment_status {
                Some(PaymentStatus::Dp) => response
                    .remaining_balance
                    .map(format_rupiah)
                    .unwrap_or_else(|| "-".to_string()),
                _ => "-".to_string(),
            },
            notes: or_dash(b.notes.as_deref()),
            created_at: b.created_at.format("%d/%m/%Y %H:%M").to_string(),
            payment_proof_url: or_dash(response.payment_proof_url.as_deref()),
        }
    }

    /// Cells in header order
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.booking_code.clone(),
            self.customer_name.clone(),
            self.booking_date.clone(),
            self.guest_count.to_string(),
            self.whatsapp.clone(),
            self.instagram.clone(),
            self.seating_spot.clone(),
            self.order.clone(),
            self.subtotal.clone(),
            self.tax.clone(),
            self.total.clone(),
            self.dp_amount.clone(),
            self.status.clone(),
            self.cancellation_reason.clone(),
            self.payment_status.clone(),
            self.paid_amount.clone(),
            self.remaining.clone(),
            self.notes.clone(),
            self.created_at.clone(),
            self.payment_proof_url.clone(),
        ]
    }
}

/// Renders export rows into a downloadable document
pub trait TabularExporter: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn file_extension(&self) -> &'static str;

    fn render(&self, rows: &[BookingExportRow]) -> Result<Vec<u8>, ExportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to encode export: {0}")]
    Encode(#[from] serde_json::Error),
}

/// RFC 4180 CSV with a header row
#[derive(Debug, Clone, Copy)]
pub struct CsvExporter {
    tax_rate: Decimal,
}

impl CsvExporter {
    pub fn new(tax_rate: Decimal) -> Self {
        Self { tax_rate }
    }

    /// Cells a spreadsheet would read as a formula get a leading quote.
    /// The lone `-` placeholder stays as is.
    fn neutralize(cell: &str) -> Cow<'_, str> {
        let formula = match cell.chars().next() {
            Some('=' | '+' | '@' | '\t' | '\r') => true,
            Some('-') => cell.len() > 1,
            _ => false,
        };
        if formula {
            Cow::Owned(format!("'{}", cell))
        } else {
            Cow::Borrowed(cell)
        }
    }

    fn escape(cell: &str) -> String {
        let cell = Self::neutralize(cell);
        if cell.contains([',', '"', '\n', '\r']) {
            format!("\"{}\"", cell.replace('"', "\"\""))
        } else {
            cell.into_owned()
        }
    }

    fn line<I, S>(cells: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut line = cells
            .into_iter()
            .map(|cell| Self::escape(cell.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        line.push_str("\r\n");
        line
    }
}

impl TabularExporter for CsvExporter {
    fn content_type(&self) -> &'static str {
        "text/csv; charset=utf-8"
    }

    fn file_extension(&self) -> &'static str {
        "csv"
    }

    fn render(&self, rows: &[BookingExportRow]) -> Result<Vec<u8>, ExportError> {
        let mut out = Self::line(export_headers(self.tax_rate));
        for row in rows {
            out.push_str(&Self::line(row.cells()));
        }
        Ok(out.into_bytes())
    }
}

/// JSON array of rows
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

impl TabularExporter for JsonExporter {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, rows: &[BookingExportRow]) -> Result<Vec<u8>, ExportError> {
        Ok(serde_json::to_vec(rows)?)
    }
}

/// Exporter for a `?format=` value; CSV when absent
pub fn exporter_for(
    format: Option<&str>,
    tax_rate: Decimal,
) -> Result<Box<dyn TabularExporter>, ExportError> {
    match format.map(|f| f.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("csv") => Ok(Box::new(CsvExporter::new(tax_rate))),
        Some("json") => Ok(Box::new(JsonExporter)),
        Some(other) => Err(ExportError::UnsupportedFormat(other.to_string())),
    }
}
