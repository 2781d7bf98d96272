use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::bookings::{BookingItem, BookingResponse, PaymentStatus};
use crate::notification::Substitutions;

/// Used when the `wa_template_customer` setting is empty
pub const DEFAULT_CUSTOMER_TEMPLATE: &str = "Halo, saya ingin konfirmasi booking:\n\n\
Kode: {booking_code}\n\
Nama: {customer_name}\n\
Tanggal: {booking_date}\n\
Jumlah Tamu: {guest_count}\n\
Spot Prioritas: {spot_name}\n\
Spot Alternatif: {alternative_spot_name}\n\n\
*Pesanan:*\n{menu_items}\n\
*Pembayaran:*\n\
Subtotal: {subtotal}\n\
PPN 10%: {tax}\n\
Total: {total}\n\
DP (50%): {dp_amount}\n\n\
Terima kasih!";

/// Used when the `wa_template_confirm` setting is empty
pub const DEFAULT_CONFIRM_TEMPLATE: &str = "Halo {customer_name}!\n\n\
Booking Anda telah *DIKONFIRMASI*\n\n\
*Detail Booking:*\n\
Kode: {booking_code}\n\
Tanggal: {booking_date}\n\
Spot: {spot_name}\n\n\
*Pesanan:*\n{menu_items}\n\
*Pembayaran:*\n\
Total: {total}\n\
Dibayar: {paid_amount}\n\
{remaining_text}\n\n\
Sampai jumpa!";

/// "Rp 110.000": whole rupiah with dot thousands separators
pub fn format_rupiah(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().to_u128().unwrap_or_default().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("Rp -{}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}

/// "15 March 2026"
pub fn format_booking_date(date: NaiveDate) -> String {
    date.format("%d %B %Y").to_string()
}

fn item_name(item: &BookingItem) -> String {
    item.menu_name
        .clone()
        .unwrap_or_else(|| format!("Menu #{}", item.menu_id))
}

/// One "• Name (opt, opt) xQ = Rp 1.234" line per item
pub fn menu_items_text(items: &[BookingItem]) -> String {
    items
        .iter()
        .map(|item| {
            let options = item
                .options_text()
                .map(|text| format!(" ({})", text))
                .unwrap_or_default();
            format!(
                "• {}{} x{} = {}\n",
                item_name(item),
                options,
                item.quantity,
                format_rupiah(item.subtotal)
            )
        })
        .collect()
}

fn or_dash(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

/// Placeholder values for a booking message
pub fn booking_substitutions(booking: &BookingResponse) -> Substitutions {
    let b = &booking.booking;
    let remaining_text = match (b.payment_status, b.remaining_balance()) {
        (Some(PaymentStatus::Dp), Some(remaining)) => format!("Sisa: {}", format_rupiah(remaining)),
        _ => String::new(),
    };

    Substitutions::from([
        ("booking_code", b.booking_code.clone()),
        ("customer_name", b.customer_name.clone()),
        ("booking_date", format_booking_date(b.booking_date)),
        ("guest_count", format!("{} orang", b.guest_count)),
        ("spot_name", or_dash(booking.seating_spot_name.as_deref())),
        (
            "alternative_spot_name",
            or_dash(booking.alternative_seating_spot_name.as_deref()),
        ),
        ("menu_items", menu_items_text(&booking.items)),
        ("subtotal", format_rupiah(b.subtotal_amount)),
        ("tax", format_rupiah(b.tax_amount)),
        ("total", format_rupiah(b.total_amount)),
        ("dp_amount", format_rupiah(b.dp_amount)),
        (
            "paid_amount",
            format_rupiah(b.paid_amount.unwrap_or(Decimal::ZERO)),
        ),
        ("remaining_text", remaining_text),
        ("whatsapp", b.whatsapp.clone()),
        ("instagram", or_dash(b.instagram.as_deref())),
        ("notes", or_dash(b.notes.as_deref())),
        ("payment_proof_url", or_dash(booking.payment_proof_url.as_deref())),
    ])
}

/// `https://wa.me/<digits>?text=<urlencoded message>`
pub fn wa_link(number: &str, message: &str) -> String {
    let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("https://wa.me/{}?text={}", digits, urlencoding::encode(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{BraceTemplateRenderer, TemplateRenderer};
    use crate::test_utils::sample_response;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_rupiah() {
        assert_eq!(format_rupiah(dec!(110000)), "Rp 110.000");
        assert_eq!(format_rupiah(dec!(55000.00)), "Rp 55.000");
        assert_eq!(format_rupiah(dec!(999)), "Rp 999");
        assert_eq!(format_rupiah(dec!(1234567.5)), "Rp 1.234.568");
        assert_eq!(format_rupiah(dec!(0)), "Rp 0");
        assert_eq!(format_rupiah(dec!(-5000)), "Rp -5.000");
    }

    #[test]
    fn test_format_booking_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        assert_eq!(format_booking_date(date), "15 March 2026");
    }

    #[test]
    fn test_menu_items_text() {
        let response = sample_response();
        assert_eq!(
            menu_items_text(&response.items),
            "• Paket Hemat A (Dada) x2 = Rp 100.000\n"
        );
    }

    #[test]
    fn test_customer_message() {
        let response = sample_response();
        let message = BraceTemplateRenderer.render(DEFAULT_CUSTOMER_TEMPLATE, &booking_substitutions(&response));
        assert!(message.contains("Kode: BK20260315AB12"));
        assert!(message.contains("Jumlah Tamu: 4 orang"));
        assert!(message.contains("Spot Alternatif: -"));
        assert!(message.contains("Total: Rp 110.000"));
        assert!(message.contains("DP (50%): Rp 55.000"));
        assert!(!message.contains('{'));
    }

    #[test]
    fn test_remaining_text_only_for_dp() {
        let mut response = sample_response();
        response.booking.payment_status = Some(PaymentStatus::Dp);
        response.booking.paid_amount = Some(dec!(55000));
        let values = booking_substitutions(&response);
        assert_eq!(values["remaining_text"], "Sisa: Rp 55.000");
        assert_eq!(values["paid_amount"], "Rp 55.000");

        response.booking.payment_status = Some(PaymentStatus::Lunas);
        response.booking.paid_amount = Some(dec!(110000));
        assert_eq!(booking_substitutions(&response)["remaining_text"], "");
    }

    #[test]
    fn test_wa_link_encodes_message() {
        let link = wa_link("+62 858-1303-5292", "Halo Siti!\nKode: BK1");
        assert_eq!(link, "https://wa.me/6285813035292?text=Halo%20Siti%21%0AKode%3A%20BK1");
    }
}
