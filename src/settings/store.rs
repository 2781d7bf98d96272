// Site settings store
//
// Read-through cache over the site_settings table. Entries expire after a TTL
// and writes invalidate the touched key together with the all-settings list.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::config::DEFAULT_SETTINGS_CACHE_TTL;
use crate::settings::{SettingsUpdate, SiteSetting};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Unknown setting: {0}")]
    UnknownKey(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence behind the settings cache
#[async_trait]
pub trait SettingsBackend: Send + Sync {
    async fn load_all(&self) -> Result<Vec<SiteSetting>, sqlx::Error>;

    /// Outer None: no such key. Inner None: key exists with no value.
    async fn load_value(&self, key: &str) -> Result<Option<Option<String>>, sqlx::Error>;

    /// Returns false when the key does not exist
    async fn save(&self, key: &str, value: Option<&str>) -> Result<bool, sqlx::Error>;
}

/// Read access used by the booking flow
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;
}

pub struct PgSettingsBackend {
    pool: PgPool,
}

impl PgSettingsBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsBackend for PgSettingsBackend {
    async fn load_all(&self) -> Result<Vec<SiteSetting>, sqlx::Error> {
        sqlx::query_as::<_, SiteSetting>(
            r#"
            SELECT id, key, value, label, type, sort_order, created_at, updated_at
            FROM site_settings
            ORDER BY sort_order, key
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn load_value(&self, key: &str) -> Result<Option<Option<String>>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<String>>("SELECT value FROM site_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
    }

    async fn save(&self, key: &str, value: Option<&str>) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE site_settings SET value = $1, updated_at = NOW() WHERE key = $2",
        )
        .bind(value)
        .bind(key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Default)]
struct SettingsCache {
    values: HashMap<String, (Option<String>, Instant)>,
    all: Option<(Vec<SiteSetting>, Instant)>,
}

impl SettingsCache {
    fn fresh_value(&self, key: &str, ttl: Duration) -> Option<Option<String>> {
        self.values
            .get(key)
            .filter(|(_, loaded_at)| loaded_at.elapsed() < ttl)
            .map(|(value, _)| value.clone())
    }

    fn fresh_all(&self, ttl: Duration) -> Option<Vec<SiteSetting>> {
        self.all
            .as_ref()
            .filter(|(_, loaded_at)| loaded_at.elapsed() < ttl)
            .map(|(settings, _)| settings.clone())
    }
}

/// Cached site settings
pub struct SettingsStore {
    backend: Arc<dyn SettingsBackend>,
    cache: Arc<RwLock<SettingsCache>>,
    cache_ttl: Duration,
}

impl SettingsStore {
    pub fn new(backend: Arc<dyn SettingsBackend>) -> Self {
        Self::with_ttl(backend, DEFAULT_SETTINGS_CACHE_TTL)
    }

    pub fn with_ttl(backend: Arc<dyn SettingsBackend>, cache_ttl: Duration) -> Self {
        Self {
            backend,
            cache: Arc::new(RwLock::new(SettingsCache::default())),
            cache_ttl,
        }
    }

    /// Value of `key`, or `default` when the key is missing or empty
    pub async fn get_or(&self, key: &str, default: &str) -> Result<String, SettingsError> {
        Ok(self
            .value(key)
            .await?
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    async fn value(&self, key: &str) -> Result<Option<String>, SettingsError> {
        // Fast path under the read lock
        {
            let cache = self.cache.read().await;
            if let Some(value) = cache.fresh_value(key, self.cache_ttl) {
                return Ok(value);
            }
        }

        let mut cache = self.cache.write().await;
        // Another task may have refreshed while we waited
        if let Some(value) = cache.fresh_value(key, self.cache_ttl) {
            return Ok(value);
        }

        tracing::debug!("Settings cache miss for {}", key);
        let value = self.backend.load_value(key).await?.flatten();
        cache
            .values
            .insert(key.to_string(), (value.clone(), Instant::now()));
        Ok(value)
    }

    /// Every setting in display order
    pub async fn all(&self) -> Result<Vec<SiteSetting>, SettingsError> {
        {
            let cache = self.cache.read().await;
            if let Some(settings) = cache.fresh_all(self.cache_ttl) {
                return Ok(settings);
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(settings) = cache.fresh_all(self.cache_ttl) {
            return Ok(settings);
        }

        tracing::debug!("Settings cache miss for the full list");
        let settings = self.backend.load_all().await?;
        cache.all = Some((settings.clone(), Instant::now()));
        Ok(settings)
    }

    /// Settings as key -> value, for the public site
    pub async fn as_map(&self) -> Result<BTreeMap<String, Option<String>>, SettingsError> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .map(|setting| (setting.key, setting.value))
            .collect())
    }

    pub async fn set(&self, key: &str, value: Option<&str>) -> Result<(), SettingsError> {
        let saved = self.backend.save(key, value).await?;
        self.invalidate(key).await;
        if !saved {
            return Err(SettingsError::UnknownKey(key.to_string()));
        }
        tracing::info!("Updated setting {}", key);
        Ok(())
    }

    /// Apply several updates; stops at the first unknown key
    pub async fn update_many(&self, updates: &SettingsUpdate) -> Result<usize, SettingsError> {
        for (key, value) in updates {
            self.set(key, value.as_deref()).await?;
        }
        Ok(updates.len())
    }

    async fn invalidate(&self, key: &str) {
        let mut cache = self.cache.write().await;
        cache.values.remove(key);
        cache.all = None;
    }

    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        cache.values.clear();
        cache.all = None;
        tracing::info!("Settings cache cleared");
    }
}

#[async_trait]
impl SettingsProvider for SettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        self.value(key).await
    }
}
