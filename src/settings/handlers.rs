use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::collections::BTreeMap;

use crate::error::ApiError;
use crate::settings::{SettingValue, SettingsUpdate, SiteSetting};

/// Handler for GET /api/settings
/// Public key -> value map for the site header and footer
pub async fn public_settings_handler(
    State(state): State<crate::AppState>,
) -> Result<Json<BTreeMap<String, Option<String>>>, ApiError> {
    Ok(Json(state.settings.as_map().await?))
}

/// Handler for GET /api/admin/settings
pub async fn list_settings_handler(
    State(state): State<crate::AppState>,
) -> Result<Json<Vec<SiteSetting>>, ApiError> {
    Ok(Json(state.settings.all().await?))
}

/// Handler for PUT /api/admin/settings
pub async fn update_settings_handler(
    State(state): State<crate::AppState>,
    Json(updates): Json<SettingsUpdate>,
) -> Result<Json<Vec<SiteSetting>>, ApiError> {
    let count = state.settings.update_many(&updates).await?;
    tracing::info!("Updated {} settings", count);
    Ok(Json(state.settings.all().await?))
}

/// Handler for PUT /api/admin/settings/:key
pub async fn update_setting_handler(
    State(state): State<crate::AppState>,
    Path(key): Path<String>,
    Json(payload): Json<SettingValue>,
) -> Result<StatusCode, ApiError> {
    state.settings.set(&key, payload.value.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /api/admin/settings/cache/clear
pub async fn clear_settings_cache_handler(State(state): State<crate::AppState>) -> StatusCode {
    state.settings.clear_cache().await;
    StatusCode::NO_CONTENT
}
