// Configuration module
// Loads typed application and booking settings from environment variables

use chrono::{FixedOffset, Offset, Utc};
use rust_decimal::Decimal;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::bookings::PricingRates;

/// Default tax rate in percent
pub const DEFAULT_TAX_RATE: u32 = 10;

/// Default minimum down payment in percent of the total
pub const DEFAULT_DP_PERCENTAGE: u32 = 50;

/// Hour of day (24h) after which same-day booking closes
pub const DEFAULT_CUTOFF_HOUR: u32 = 15;

/// WIB (UTC+7)
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;

/// Attempts at generating a unique booking code before giving up
pub const DEFAULT_MAX_CODE_ATTEMPTS: u32 = 5;

/// Settings cache time-to-live
pub const DEFAULT_SETTINGS_CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Booking terms shown to customers before they submit
pub fn default_booking_rules() -> Vec<String> {
    [
        "Booking untuk hari yang sama hanya bisa dilakukan sebelum jam 15:00 WIB.",
        "Pembayaran DP minimal 50% dari total pesanan untuk konfirmasi booking.",
        "Sisa pembayaran dilunasi pada saat buka puasa.",
        "Pembatalan booking maksimal H-1 sebelum tanggal booking.",
        "Menu yang sudah dipesan tidak dapat diubah pada hari H.",
        "Waktu buka puasa mengikuti jadwal yang telah ditentukan.",
    ]
    .iter()
    .map(|rule| rule.to_string())
    .collect()
}

/// Business configuration read by the booking core
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Tax rate in percent (10 = 10%)
    pub tax_rate: Decimal,
    /// Minimum deposit in percent of the total
    pub dp_percentage: Decimal,
    pub cutoff_hour: u32,
    /// Timezone in which booking dates and the cutoff are evaluated
    pub timezone: FixedOffset,
    pub booking_rules: Vec<String>,
    /// Refuse bookings that would exceed a spot's capacity for the day
    pub enforce_spot_capacity: bool,
    pub max_code_attempts: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::from(DEFAULT_TAX_RATE),
            dp_percentage: Decimal::from(DEFAULT_DP_PERCENTAGE),
            cutoff_hour: DEFAULT_CUTOFF_HOUR,
            timezone: offset_from_hours(DEFAULT_UTC_OFFSET_HOURS).unwrap_or_else(|| Utc.fix()),
            booking_rules: default_booking_rules(),
            enforce_spot_capacity: true,
            max_code_attempts: DEFAULT_MAX_CODE_ATTEMPTS,
        }
    }
}

impl BookingConfig {
    /// Build the booking configuration from a key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let utc_offset_hours: i32 =
            parse_or(&lookup, "BOOKING_UTC_OFFSET_HOURS", DEFAULT_UTC_OFFSET_HOURS)?;
        let timezone = offset_from_hours(utc_offset_hours).ok_or_else(|| ConfigError::Invalid {
            key: "BOOKING_UTC_OFFSET_HOURS".to_string(),
            message: format!("{} is not a valid UTC offset", utc_offset_hours),
        })?;

        let booking_rules = match lookup("BOOKING_RULES") {
            Some(raw) if !raw.trim().is_empty() => raw
                .split('|')
                .map(|rule| rule.trim().to_string())
                .filter(|rule| !rule.is_empty())
                .collect(),
            _ => defaults.booking_rules,
        };

        let config = Self {
            tax_rate: parse_or(&lookup, "BOOKING_TAX_RATE", defaults.tax_rate)?,
            dp_percentage: parse_or(&lookup, "BOOKING_DP_PERCENTAGE", defaults.dp_percentage)?,
            cutoff_hour: parse_or(&lookup, "BOOKING_CUTOFF_HOUR", defaults.cutoff_hour)?,
            timezone,
            booking_rules,
            enforce_spot_capacity: parse_bool_or(
                &lookup,
                "BOOKING_ENFORCE_SPOT_CAPACITY",
                defaults.enforce_spot_capacity,
            )?,
            max_code_attempts: parse_or(&lookup, "BOOKING_MAX_CODE_ATTEMPTS", defaults.max_code_attempts)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Rates handed to the pricing engine
    pub fn pricing_rates(&self) -> PricingRates {
        PricingRates {
            tax_rate_percent: self.tax_rate,
            dp_percent: self.dp_percentage,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tax_rate < Decimal::ZERO {
            return Err(invalid("BOOKING_TAX_RATE", "must be non-negative"));
        }
        if self.dp_percentage < Decimal::ZERO || self.dp_percentage > Decimal::ONE_HUNDRED {
            return Err(invalid("BOOKING_DP_PERCENTAGE", "must be between 0 and 100"));
        }
        if self.cutoff_hour > 23 {
            return Err(invalid("BOOKING_CUTOFF_HOUR", "must be between 0 and 23"));
        }
        if self.max_code_attempts == 0 {
            return Err(invalid("BOOKING_MAX_CODE_ATTEMPTS", "must be at least 1"));
        }
        Ok(())
    }
}

/// Process-level configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Root directory for uploaded files
    pub storage_dir: PathBuf,
    /// Base URL under which stored files are served
    pub public_base_url: String,
    pub settings_cache_ttl: Duration,
    pub booking: BookingConfig,
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::Missing("DATABASE_URL".to_string()))?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", 8080u16)?;
        let storage_dir = PathBuf::from(lookup("STORAGE_DIR").unwrap_or_else(|| "storage".to_string()));
        let public_base_url = lookup("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}/storage", port))
            .trim_end_matches('/')
            .to_string();
        let ttl_secs = parse_or(
            &lookup,
            "SETTINGS_CACHE_TTL_SECS",
            DEFAULT_SETTINGS_CACHE_TTL.as_secs(),
        )?;

        Ok(Self {
            database_url,
            host,
            port,
            storage_dir,
            public_base_url,
            settings_cache_ttl: Duration::from_secs(ttl_secs),
            booking: BookingConfig::from_lookup(&lookup)?,
        })
    }
}

fn offset_from_hours(hours: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(hours.checked_mul(3600)?)
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool_or<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|raw| raw.trim().to_lowercase()) {
        Some(value) => match value.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::Invalid {
                key: key.to_string(),
                message: format!("'{}' is not a boolean", other),
            }),
        },
        None => Ok(default),
    }
}
