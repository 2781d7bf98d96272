use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::error::ApiError;
use crate::storage::{check_image, PAYMENT_PROOF_DIR};

/// What an upload is for; decides its directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Payments,
    Menus,
    Spots,
}

impl UploadKind {
    pub fn dir(&self) -> &'static str {
        match self {
            UploadKind::Payments => PAYMENT_PROOF_DIR,
            UploadKind::Menus => "menus",
            UploadKind::Spots => "spots",
        }
    }
}

impl std::str::FromStr for UploadKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payments" => Ok(UploadKind::Payments),
            "menus" => Ok(UploadKind::Menus),
            "spots" => Ok(UploadKind::Spots),
            other => Err(ApiError::bad_request(
                "kind",
                format!("Unknown upload kind '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Reference to send back in booking, menu or spot payloads
    pub path: String,
    pub url: String,
    pub size: usize,
}

/// Handler for POST /api/uploads/:kind
/// Expects a multipart body with a `file` field holding an image
pub async fn upload_handler(
    State(state): State<crate::AppState>,
    Path(kind): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let kind: UploadKind = kind.parse()?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request("file", format!("Invalid multipart request: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request("file", format!("Multipart error: {}", e)))?;
        if data.is_empty() {
            return Err(ApiError::bad_request("file", "Empty file provided"));
        }

        let extension = check_image(&content_type, data.len())?;
        let path = state.storage.store(kind.dir(), &data, extension).await?;
        let url = state.storage.public_url(&path);
        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                path,
                url,
                size: data.len(),
            }),
        ));
    }

    Err(ApiError::bad_request("file", "No 'file' field found"))
}
