// Validation utilities module
// Provides custom validation functions for domain-specific rules

use regex::Regex;
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::sync::OnceLock;
use validator::{ValidationError, ValidationErrors};

/// Country prefix prepended to local WhatsApp numbers
pub const WHATSAPP_COUNTRY_PREFIX: &str = "62";

fn whatsapp_local_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^8[0-9]{8,13}$").expect("whatsapp pattern compiles"))
}

/// Strip formatting and any country/trunk prefix, leaving the local part
/// e.g. "+62 812-3456-7890" and "0812 3456 7890" both become "81234567890"
pub fn normalize_whatsapp(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if let Some(rest) = digits.strip_prefix(WHATSAPP_COUNTRY_PREFIX) {
        rest.to_string()
    } else if let Some(rest) = digits.strip_prefix('0') {
        rest.to_string()
    } else {
        digits
    }
}

/// Local number with the country prefix, as stored on a booking
pub fn international_whatsapp(raw: &str) -> String {
    format!("{}{}", WHATSAPP_COUNTRY_PREFIX, normalize_whatsapp(raw))
}

/// Validates an Indonesian mobile number (8xxxxxxxx after normalization)
pub fn validate_whatsapp_local(number: &str) -> Result<(), ValidationError> {
    if whatsapp_local_pattern().is_match(&normalize_whatsapp(number)) {
        Ok(())
    } else {
        let mut error = ValidationError::new("invalid_whatsapp");
        error.message = Some(Cow::from("WhatsApp number must look like 81234567890"));
        Err(error)
    }
}

/// Validates that a string is not blank after trimming
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

/// Field-level error for a money amount that must be >= 0
pub fn non_negative_amount(field: &'static str, value: Decimal) -> Result<(), ValidationErrors> {
    if value < Decimal::ZERO {
        let mut error = ValidationError::new("amount_must_be_non_negative");
        error.message = Some(Cow::from("Amount must not be negative"));
        let mut errors = ValidationErrors::new();
        errors.add(field, error);
        Err(errors)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_whatsapp_accepts_local_forms() {
        assert!(validate_whatsapp_local("81234567890").is_ok());
        assert!(validate_whatsapp_local("081234567890").is_ok());
        assert!(validate_whatsapp_local("+62 812-3456-7890").is_ok());
    }

    #[test]
    fn test_whatsapp_rejects_bad_numbers() {
        assert!(validate_whatsapp_local("").is_err());
        assert!(validate_whatsapp_local("712345678").is_err());
        assert!(validate_whatsapp_local("8123").is_err());
        assert!(validate_whatsapp_local("8123456789012345").is_err());
    }

    #[test]
    fn test_international_whatsapp() {
        assert_eq!(international_whatsapp("0812 3456 7890"), "6281234567890");
        assert_eq!(international_whatsapp("6281234567890"), "6281234567890");
    }

    #[test]
    fn test_non_negative_amount() {
        assert!(non_negative_amount("paid_amount", dec!(0)).is_ok());
        let errors = non_negative_amount("paid_amount", dec!(-1)).unwrap_err();
        assert!(errors.field_errors().contains_key("paid_amount"));
    }
}
