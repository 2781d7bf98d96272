use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::sync::Arc;

use crate::availability::{
    is_available, is_past_cutoff, parse_date, BookingDate, BookingDateStore, Clock,
    UpsertBookingDate,
};

/// Days ahead offered by the booking form
pub const AVAILABLE_DATES_HORIZON: i64 = 30;

/// Date availability backed by a store of overrides and a clock
#[derive(Clone)]
pub struct AvailabilityService {
    dates: Arc<dyn BookingDateStore>,
    clock: Arc<dyn Clock>,
    cutoff_hour: u32,
}

impl AvailabilityService {
    pub fn new(dates: Arc<dyn BookingDateStore>, clock: Arc<dyn Clock>, cutoff_hour: u32) -> Self {
        Self {
            dates,
            clock,
            cutoff_hour,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn cutoff_hour(&self) -> u32 {
        self.cutoff_hour
    }

    pub fn is_past_cutoff(&self) -> bool {
        is_past_cutoff(self.clock.now(), self.cutoff_hour)
    }

    /// Is `date` bookable right now?
    pub async fn is_available(&self, date: NaiveDate) -> Result<bool, sqlx::Error> {
        let now = self.clock.now();
        if date < now.date_naive() {
            return Ok(false);
        }
        let record = self.dates.find_date(date).await?;
        Ok(is_available(date, now, record.as_ref(), self.cutoff_hour))
    }

    /// String form of `is_available`; malformed dates are unavailable
    pub async fn is_available_str(&self, raw: &str) -> Result<bool, sqlx::Error> {
        match parse_date(raw) {
            Some(date) => self.is_available(date).await,
            None => {
                tracing::debug!("Unparseable booking date '{}' treated as unavailable", raw);
                Ok(false)
            }
        }
    }

    /// Bookable dates from today over the next `horizon` days
    pub async fn available_dates(&self, horizon: i64) -> Result<Vec<NaiveDate>, sqlx::Error> {
        let now = self.clock.now();
        let today = now.date_naive();
        let last = today + Duration::days(horizon.max(1) - 1);

        let overrides: HashMap<NaiveDate, BookingDate> = self
            .dates
            .dates_between(today, last)
            .await?
            .into_iter()
            .map(|record| (record.date, record))
            .collect();

        Ok(today
            .iter_days()
            .take_while(|day| *day <= last)
            .filter(|day| is_available(*day, now, overrides.get(day), self.cutoff_hour))
            .collect())
    }

    /// Open today even past the cutoff
    pub async fn force_open_today(&self) -> Result<BookingDate, sqlx::Error> {
        let today = self.today();
        let existing = self.dates.find_date(today).await?;
        let record = self
            .dates
            .upsert_date(&UpsertBookingDate {
                date: today,
                is_open: true,
                force_open: true,
                note: existing.and_then(|r| r.note),
            })
            .await?;
        tracing::info!("Force-opened bookings for {}", today);
        Ok(record)
    }

    /// Drop today's force-open flag; the cutoff applies again
    pub async fn close_today(&self) -> Result<BookingDate, sqlx::Error> {
        let today = self.today();
        let existing = self.dates.find_date(today).await?;
        let (is_open, note) = existing
            .map(|r| (r.is_open, r.note))
            .unwrap_or((true, None));
        let record = self
            .dates
            .upsert_date(&UpsertBookingDate {
                date: today,
                is_open,
                force_open: false,
                note,
            })
            .await?;
        tracing::info!("Removed force-open for {}", today);
        Ok(record)
    }

    pub async fn is_today_force_open(&self) -> Result<bool, sqlx::Error> {
        Ok(self
            .dates
            .find_date(self.today())
            .await?
            .map(|r| r.force_open)
            .unwrap_or(false))
    }

    pub async fn set_date(&self, update: &UpsertBookingDate) -> Result<BookingDate, sqlx::Error> {
        let record = self.dates.upsert_date(update).await?;
        tracing::info!(
            "Set booking date {} (open: {}, force_open: {})",
            record.date,
            record.is_open,
            record.force_open
        );
        Ok(record)
    }

    /// Overrides in a range; defaults to today through the booking horizon
    pub async fn list_dates(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<BookingDate>, sqlx::Error> {
        let from = from.unwrap_or_else(|| self.today());
        let to = to.unwrap_or(from + Duration::days(AVAILABLE_DATES_HORIZON * 2));
        self.dates.dates_between(from, to).await
    }

    /// Remove an override, restoring the default-open policy
    pub async fn delete_date(&self, date: NaiveDate) -> Result<bool, sqlx::Error> {
        let removed = self.dates.delete_date(date).await?;
        if removed {
            tracing::info!("Removed booking date override for {}", date);
        }
        Ok(removed)
    }
}
