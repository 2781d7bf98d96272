use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;

/// Editor used for a setting in the admin screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    Text,
    Textarea,
    Url,
}

/// A site-wide key/value setting such as the cafe WhatsApp number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SiteSetting {
    pub id: i64,
    pub key: String,
    pub value: Option<String>,
    pub label: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub setting_type: SettingType,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Bulk update: key -> new value
pub type SettingsUpdate = BTreeMap<String, Option<String>>;

#[derive(Debug, Clone, Deserialize)]
pub struct SettingValue {
    pub value: Option<String>,
}

/// Keys read by the booking flow
pub mod keys {
    pub const CAFE_NAME: &str = "cafe_name";
    pub const WHATSAPP: &str = "whatsapp";
    pub const WA_TEMPLATE_CUSTOMER: &str = "wa_template_customer";
    pub const WA_TEMPLATE_CONFIRM: &str = "wa_template_confirm";
}
