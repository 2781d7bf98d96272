use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::availability::{BookingDate, UpsertBookingDate};

/// Persistence for per-date overrides
#[async_trait]
pub trait BookingDateStore: Send + Sync {
    async fn find_date(&self, date: NaiveDate) -> Result<Option<BookingDate>, sqlx::Error>;

    /// Overrides with `from <= date <= to`, ascending
    async fn dates_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BookingDate>, sqlx::Error>;

    async fn upsert_date(&self, update: &UpsertBookingDate) -> Result<BookingDate, sqlx::Error>;

    /// Returns false when no override existed
    async fn delete_date(&self, date: NaiveDate) -> Result<bool, sqlx::Error>;
}

/// Repository for the booking_dates table
#[derive(Clone)]
pub struct BookingDateRepository {
    pool: PgPool,
}

impl BookingDateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const DATE_COLUMNS: &str = "id, date, is_open, force_open, note, created_at, updated_at";

#[async_trait]
impl BookingDateStore for BookingDateRepository {
    async fn find_date(&self, date: NaiveDate) -> Result<Option<BookingDate>, sqlx::Error> {
        sqlx::query_as::<_, BookingDate>(&format!(
            "SELECT {} FROM booking_dates WHERE date = $1",
            DATE_COLUMNS
        ))
        .bind(date)
        .fetch_optional(&self.pool)
        .await
    }

    async fn dates_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BookingDate>, sqlx::Error> {
        sqlx::query_as::<_, BookingDate>(&format!(
            "SELECT {} FROM booking_dates WHERE date BETWEEN $1 AND $2 ORDER BY date",
            DATE_COLUMNS
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
    }

    async fn upsert_date(&self, update: &UpsertBookingDate) -> Result<BookingDate, sqlx::Error> {
        sqlx::query_as::<_, BookingDate>(&format!(
            r#"
            INSERT INTO booking_dates (date, is_open, force_open, note)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (date) DO UPDATE
            SET is_open = EXCLUDED.is_open,
                force_open = EXCLUDED.force_open,
                note = EXCLUDED.note,
                updated_at = NOW()
            RETURNING {}
            "#,
            DATE_COLUMNS
        ))
        .bind(update.date)
        .bind(update.is_open)
        .bind(update.force_open)
        .bind(&update.note)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_date(&self, date: NaiveDate) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM booking_dates WHERE date = $1")
            .bind(date)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
