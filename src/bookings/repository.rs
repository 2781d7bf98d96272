use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use crate::bookings::{
    Booking, BookingCounts, BookingError, BookingFilter, BookingItem, CapacityGuard, ItemChanges,
    NewBooking, NewBookingItem, PriceCalculator, PricingRates, SQLQueryBuilder,
};
use crate::db::violates_constraint;

/// Unique constraint on bookings.booking_code
pub const BOOKING_CODE_CONSTRAINT: &str = "bookings_booking_code_key";

/// Persistence for bookings and their items
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Insert a pending booking and its items atomically
    ///
    /// With a guard, the spot's remaining capacity for the day is checked in
    /// the same transaction. A taken booking code yields `DuplicateCode`.
    async fn insert(
        &self,
        booking: &NewBooking,
        items: &[NewBookingItem],
        guard: Option<CapacityGuard>,
    ) -> Result<Booking, BookingError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Booking>, BookingError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Booking>, BookingError>;

    async fn items_for(&self, booking_id: i64) -> Result<Vec<BookingItem>, BookingError>;

    async fn items_for_many(&self, booking_ids: &[i64]) -> Result<Vec<BookingItem>, BookingError>;

    /// Write the mutable columns of `booking` except its totals; last write wins
    ///
    /// Totals only change through `replace_items`, together with the items.
    async fn update(&self, booking: &Booking) -> Result<Booking, BookingError>;

    /// Apply item changes with the booking row locked, then re-derive the
    /// totals from the items now stored
    ///
    /// Empty changes just re-derive the totals. A booking left without items
    /// is refused and nothing is written.
    async fn replace_items(
        &self,
        booking_id: i64,
        changes: &ItemChanges,
        rates: PricingRates,
    ) -> Result<Booking, BookingError>;

    async fn delete(&self, id: i64) -> Result<Option<Booking>, BookingError>;

    /// One page of matches plus the total number of matches
    async fn list(&self, filter: &BookingFilter) -> Result<(Vec<Booking>, i64), BookingError>;

    async fn stats(&self, today: NaiveDate) -> Result<BookingCounts, BookingError>;
}

const BOOKING_COLUMNS: &str = "id, booking_code, customer_name, booking_date, guest_count, \
     whatsapp, instagram, seating_spot_id, alternative_seating_spot_id, subtotal_amount, \
     tax_amount, total_amount, dp_amount, payment_proof, status, payment_status, paid_amount, \
     confirmed_at, cancellation_reason, notes, created_at, updated_at";

const ITEM_SELECT: &str = r#"
    SELECT bi.id, bi.booking_id, bi.menu_id, m.name AS menu_name, bi.quantity,
           bi.unit_price, bi.subtotal, bi.selected_options
    FROM booking_items bi
    LEFT JOIN menus m ON m.id = bi.menu_id
"#;

/// Repository for booking operations
#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_items(
    tx: &mut Transaction<'_, Postgres>,
    booking_id: i64,
    items: &[NewBookingItem],
) -> Result<(), sqlx::Error> {
    for item in items {
        sqlx::query(
            r#"
            INSERT INTO booking_items (booking_id, menu_id, quantity, unit_price, subtotal, selected_options)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(booking_id)
        .bind(item.menu_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.subtotal)
        .bind(Json(&item.selected_options))
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Lock the spot row, then compare the day's seated guests with its capacity
async fn check_capacity(
    tx: &mut Transaction<'_, Postgres>,
    guard: CapacityGuard,
) -> Result<(), BookingError> {
    sqlx::query("SELECT id FROM seating_spots WHERE id = $1 FOR UPDATE")
        .bind(guard.spot_id)
        .execute(&mut **tx)
        .await?;

    let booked: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(guest_count), 0)::BIGINT
        FROM bookings
        WHERE seating_spot_id = $1 AND booking_date = $2 AND status <> 'cancelled'
        "#,
    )
    .bind(guard.spot_id)
    .bind(guard.booking_date)
    .fetch_one(&mut **tx)
    .await?;

    if booked + i64::from(guard.guests) > i64::from(guard.capacity) {
        return Err(BookingError::SpotFull {
            spot_id: guard.spot_id,
            date: guard.booking_date,
            capacity: guard.capacity,
            booked,
        });
    }
    Ok(())
}

#[async_trait]
impl BookingStore for BookingRepository {
    async fn insert(
        &self,
        booking: &NewBooking,
        items: &[NewBookingItem],
        guard: Option<CapacityGuard>,
    ) -> Result<Booking, BookingError> {
        let mut tx = self.pool.begin().await?;

        if let Some(guard) = guard {
            check_capacity(&mut tx, guard).await?;
        }

        let inserted = sqlx::query_as::<_, Booking>(&format!(
            r#"
            INSERT INTO bookings (
                booking_code, customer_name, booking_date, guest_count, whatsapp, instagram,
                seating_spot_id, alternative_seating_spot_id, subtotal_amount, tax_amount,
                total_amount, dp_amount, payment_proof, status, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'pending', $14)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(&booking.booking_code)
        .bind(&booking.customer_name)
        .bind(booking.booking_date)
        .bind(booking.guest_count)
        .bind(&booking.whatsapp)
        .bind(&booking.instagram)
        .bind(booking.seating_spot_id)
        .bind(booking.alternative_seating_spot_id)
        .bind(booking.totals.subtotal)
        .bind(booking.totals.tax)
        .bind(booking.totals.total)
        .bind(booking.totals.dp)
        .bind(&booking.payment_proof)
        .bind(&booking.notes)
        .fetch_one(&mut *tx)
        .await;

        let inserted = match inserted {
            Ok(row) => row,
            Err(e) if violates_constraint(&e, BOOKING_CODE_CONSTRAINT) => {
                return Err(BookingError::DuplicateCode)
            }
            Err(e) => return Err(e.into()),
        };

        insert_items(&mut tx, inserted.id, items).await?;
        tx.commit().await?;

        Ok(inserted)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Booking>, BookingError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Booking>, BookingError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {} FROM bookings WHERE booking_code = $1",
            BOOKING_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn items_for(&self, booking_id: i64) -> Result<Vec<BookingItem>, BookingError> {
        let items = sqlx::query_as::<_, BookingItem>(&format!(
            "{} WHERE bi.booking_id = $1 ORDER BY bi.id",
            ITEM_SELECT
        ))
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn items_for_many(&self, booking_ids: &[i64]) -> Result<Vec<BookingItem>, BookingError> {
        if booking_ids.is_empty() {
            return Ok(Vec::new());
        }
        let items = sqlx::query_as::<_, BookingItem>(&format!(
            "{} WHERE bi.booking_id = ANY($1) ORDER BY bi.booking_id, bi.id",
            ITEM_SELECT
        ))
        .bind(booking_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn update(&self, booking: &Booking) -> Result<Booking, BookingError> {
        let updated = sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings
            SET customer_name = $1, booking_date = $2, guest_count = $3, whatsapp = $4,
                instagram = $5, seating_spot_id = $6, alternative_seating_spot_id = $7,
                payment_proof = $8, status = $9, payment_status = $10, paid_amount = $11,
                confirmed_at = $12, cancellation_reason = $13, notes = $14, updated_at = NOW()
            WHERE id = $15
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(&booking.customer_name)
        .bind(booking.booking_date)
        .bind(booking.guest_count)
        .bind(&booking.whatsapp)
        .bind(&booking.instagram)
        .bind(booking.seating_spot_id)
        .bind(booking.alternative_seating_spot_id)
        .bind(&booking.payment_proof)
        .bind(booking.status)
        .bind(booking.payment_status)
        .bind(booking.paid_amount)
        .bind(booking.confirmed_at)
        .bind(&booking.cancellation_reason)
        .bind(&booking.notes)
        .bind(booking.id)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| BookingError::not_found("Booking", booking.id))
    }

    async fn replace_items(
        &self,
        booking_id: i64,
        changes: &ItemChanges,
        rates: PricingRates,
    ) -> Result<Booking, BookingError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i64>("SELECT id FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(booking_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| BookingError::not_found("Booking", booking_id))?;

        if !changes.removed_item_ids.is_empty() {
            sqlx::query("DELETE FROM booking_items WHERE booking_id = $1 AND id = ANY($2)")
                .bind(booking_id)
                .bind(&changes.removed_item_ids)
                .execute(&mut *tx)
                .await?;
        }

        for (item_id, quantity, subtotal) in &changes.quantity_updates {
            sqlx::query(
                "UPDATE booking_items SET quantity = $1, subtotal = $2 WHERE id = $3 AND booking_id = $4",
            )
            .bind(quantity)
            .bind(subtotal)
            .bind(item_id)
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;
        }

        insert_items(&mut tx, booking_id, &changes.added).await?;

        let stored: Vec<(Decimal, i32)> =
            sqlx::query_as("SELECT unit_price, quantity FROM booking_items WHERE booking_id = $1")
                .bind(booking_id)
                .fetch_all(&mut *tx)
                .await?;
        if stored.is_empty() {
            return Err(BookingError::invalid(
                "items",
                "A booking must keep at least one item",
            ));
        }
        let totals = PriceCalculator::totals_for_items(stored, rates)?;

        let booking = sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings
            SET subtotal_amount = $1, tax_amount = $2, total_amount = $3, dp_amount = $4,
                updated_at = NOW()
            WHERE id = $5
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(totals.subtotal)
        .bind(totals.tax)
        .bind(totals.total)
        .bind(totals.dp)
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| BookingError::not_found("Booking", booking_id))?;

        tx.commit().await?;
        Ok(booking)
    }

    async fn delete(&self, id: i64) -> Result<Option<Booking>, BookingError> {
        let deleted = sqlx::query_as::<_, Booking>(&format!(
            "DELETE FROM bookings WHERE id = $1 RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(deleted)
    }

    async fn list(&self, filter: &BookingFilter) -> Result<(Vec<Booking>, i64), BookingError> {
        let builder = SQLQueryBuilder::from_filter(filter);

        let (sql, params) = builder.build(BOOKING_COLUMNS);
        let mut query = sqlx::query_as::<_, Booking>(&sql);
        for param in &params {
            query = query.bind(param);
        }
        let bookings = query.fetch_all(&self.pool).await?;

        let (count_sql, count_params) = builder.build_count();
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for param in &count_params {
            count_query = count_query.bind(param);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        tracing::debug!("Listed {} of {} bookings", bookings.len(), total);
        Ok((bookings, total))
    }

    async fn stats(&self, today: NaiveDate) -> Result<BookingCounts, BookingError> {
        let (total, pending, confirmed, today_count, confirmed_revenue): (i64, i64, i64, i64, Decimal) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE status = 'pending'),
                    COUNT(*) FILTER (WHERE status = 'confirmed'),
                    COUNT(*) FILTER (WHERE booking_date = $1 AND status <> 'cancelled'),
                    COALESCE(SUM(total_amount) FILTER (WHERE status = 'confirmed'), 0)
                FROM bookings
                "#,
            )
            .bind(today)
            .fetch_one(&self.pool)
            .await?;

        Ok(BookingCounts {
            total,
            pending,
            confirmed,
            today: today_count,
            confirmed_revenue,
        })
    }
}
