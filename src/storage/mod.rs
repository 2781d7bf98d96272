//! File storage for payment proofs and catalog images
//!
//! Files are addressed by a relative reference such as `payments/<uuid>.jpg`,
//! which is what the database stores. The public URL is derived from it.

pub mod handlers;

pub use handlers::*;

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Maximum upload size (5MB)
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Directory of customer proof-of-payment uploads
pub const PAYMENT_PROOF_DIR: &str = "payments";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file reference: {0}")]
    InvalidPath(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("File is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: usize, max: usize },
}

/// Where uploaded files live
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `bytes` under `dir` and return the new file reference
    async fn store(&self, dir: &str, bytes: &[u8], extension: &str) -> Result<String, StorageError>;

    /// Remove a stored file; a missing file is not an error
    async fn delete(&self, path_ref: &str) -> Result<(), StorageError>;

    /// Whether `path_ref` names a stored file; malformed references do not
    async fn exists(&self, path_ref: &str) -> Result<bool, StorageError>;

    fn public_url(&self, path_ref: &str) -> String;
}

/// File extension for an accepted image content type
pub fn image_extension(content_type: &str) -> Result<&'static str, StorageError> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "image/jpeg" | "image/jpg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/webp" => Ok("webp"),
        "image/gif" => Ok("gif"),
        _ => Err(StorageError::UnsupportedType(content_type.to_string())),
    }
}

/// Size and type checks for an uploaded image; returns its extension
pub fn check_image(content_type: &str, size: usize) -> Result<&'static str, StorageError> {
    if size > MAX_IMAGE_BYTES {
        return Err(StorageError::TooLarge {
            size,
            max: MAX_IMAGE_BYTES,
        });
    }
    image_extension(content_type)
}

/// A file directly inside the payment proof directory, e.g. `payments/<uuid>.jpg`
pub fn is_payment_proof_ref(path_ref: &str) -> bool {
    path_ref
        .strip_prefix(PAYMENT_PROOF_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|name| !name.is_empty() && !name.contains('/'))
        && relative_path(path_ref).is_ok()
}

/// Relative path made only of normal components
fn relative_path(path_ref: &str) -> Result<PathBuf, StorageError> {
    let path = Path::new(path_ref);
    let safe = !path_ref.is_empty()
        && !path_ref.contains('\\')
        && path.components().all(|c| matches!(c, Component::Normal(_)));
    if safe {
        Ok(path.to_path_buf())
    } else {
        Err(StorageError::InvalidPath(path_ref.to_string()))
    }
}

/// Files on local disk under `root`, served from `public_base_url`
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, dir: &str, bytes: &[u8], extension: &str) -> Result<String, StorageError> {
        let dir_path = relative_path(dir)?;
        let target_dir = self.root.join(&dir_path);
        fs::create_dir_all(&target_dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        fs::write(target_dir.join(&file_name), bytes).await?;

        let path_ref = format!("{}/{}", dir.trim_end_matches('/'), file_name);
        tracing::info!("Stored {} bytes at {}", bytes.len(), path_ref);
        Ok(path_ref)
    }

    async fn delete(&self, path_ref: &str) -> Result<(), StorageError> {
        let path = self.root.join(relative_path(path_ref)?);
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Deleted stored file {}", path_ref);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Stored file {} was already gone", path_ref);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path_ref: &str) -> Result<bool, StorageError> {
        let Ok(relative) = relative_path(path_ref) else {
            return Ok(false);
        };
        Ok(fs::try_exists(self.root.join(relative)).await?)
    }

    fn public_url(&self, path_ref: &str) -> String {
        format!("{}/{}", self.public_base_url, path_ref.trim_start_matches('/'))
    }
}
