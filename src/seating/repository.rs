use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::is_foreign_key_violation;
use crate::error::ApiError;
use crate::seating::{CreateSeatingSpot, SeatingSpot, UpdateSeatingSpot};

/// Seating reads needed by the booking flow
#[async_trait]
pub trait SpotDirectory: Send + Sync {
    async fn find_spot(&self, id: i64) -> Result<Option<SeatingSpot>, sqlx::Error>;

    async fn list_spots(&self, active_only: bool) -> Result<Vec<SeatingSpot>, sqlx::Error>;
}

/// Repository for seating spots
#[derive(Clone)]
pub struct SeatingRepository {
    pool: PgPool,
}

const SPOT_COLUMNS: &str =
    "id, name, description, capacity, image, is_active, created_at, updated_at";

impl SeatingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All spots, optionally filtered by name
    pub async fn search(&self, search: Option<&str>) -> Result<Vec<SeatingSpot>, ApiError> {
        let spots = match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => {
                sqlx::query_as::<_, SeatingSpot>(&format!(
                    "SELECT {} FROM seating_spots WHERE name ILIKE $1 ORDER BY name",
                    SPOT_COLUMNS
                ))
                .bind(format!("%{}%", term))
                .fetch_all(&self.pool)
                .await?
            }
            None => self.list_spots(false).await?,
        };
        Ok(spots)
    }

    pub async fn get(&self, id: i64) -> Result<SeatingSpot, ApiError> {
        self.find_spot(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Seating spot", id))
    }

    pub async fn create(&self, payload: &CreateSeatingSpot) -> Result<SeatingSpot, ApiError> {
        let spot = sqlx::query_as::<_, SeatingSpot>(&format!(
            r#"
            INSERT INTO seating_spots (name, description, capacity, image, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SPOT_COLUMNS
        ))
        .bind(payload.name.trim())
        .bind(&payload.description)
        .bind(payload.capacity)
        .bind(&payload.image)
        .bind(payload.is_active.unwrap_or(true))
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Created seating spot {} ({})", spot.id, spot.name);
        Ok(spot)
    }

    pub async fn update(
        &self,
        id: i64,
        payload: &UpdateSeatingSpot,
    ) -> Result<SeatingSpot, ApiError> {
        let existing = self.get(id).await?;
        let capacity = if payload.clear_capacity {
            None
        } else {
            payload.capacity.or(existing.capacity)
        };

        let spot = sqlx::query_as::<_, SeatingSpot>(&format!(
            r#"
            UPDATE seating_spots
            SET name = $1, description = $2, capacity = $3, image = $4, is_active = $5,
                updated_at = NOW()
            WHERE id = $6
            RETURNING {}
            "#,
            SPOT_COLUMNS
        ))
        .bind(payload.name.as_deref().map(str::trim).unwrap_or(&existing.name))
        .bind(payload.description.clone().or(existing.description))
        .bind(capacity)
        .bind(payload.image.clone().or(existing.image))
        .bind(payload.is_active.unwrap_or(existing.is_active))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Updated seating spot {}", id);
        Ok(spot)
    }

    /// Delete a spot no booking points at; returns its image reference
    pub async fn delete(&self, id: i64) -> Result<Option<String>, ApiError> {
        let result = sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM seating_spots WHERE id = $1 RETURNING image",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(image)) => {
                tracing::info!("Deleted seating spot {}", id);
                Ok(image)
            }
            Ok(None) => Err(ApiError::not_found("Seating spot", id)),
            Err(e) if is_foreign_key_violation(&e) => Err(ApiError::Conflict {
                message: "Seating spot is used by bookings; deactivate it instead".to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SpotDirectory for SeatingRepository {
    async fn find_spot(&self, id: i64) -> Result<Option<SeatingSpot>, sqlx::Error> {
        sqlx::query_as::<_, SeatingSpot>(&format!(
            "SELECT {} FROM seating_spots WHERE id = $1",
            SPOT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_spots(&self, active_only: bool) -> Result<Vec<SeatingSpot>, sqlx::Error> {
        let filter = if active_only { "WHERE is_active = TRUE " } else { "" };
        sqlx::query_as::<_, SeatingSpot>(&format!(
            "SELECT {} FROM seating_spots {}ORDER BY name",
            SPOT_COLUMNS, filter
        ))
        .fetch_all(&self.pool)
        .await
    }
}
