// Availability Policy
//
// Decides whether a calendar date accepts new bookings right now.
// A date without an override row is open; same-day bookings close at the
// cutoff hour unless the date is force-opened.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::availability::BookingDate;

/// Source of the current instant, in the service timezone
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock shifted into a fixed offset (WIB by default)
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Instant at which same-day booking closes for `date`
pub fn cutoff_instant(
    date: NaiveDate,
    cutoff_hour: u32,
    offset: FixedOffset,
) -> Option<DateTime<FixedOffset>> {
    date.and_hms_opt(cutoff_hour, 0, 0)?
        .and_local_timezone(offset)
        .single()
}

/// True once `now` is at or past today's cutoff
pub fn is_past_cutoff(now: DateTime<FixedOffset>, cutoff_hour: u32) -> bool {
    match cutoff_instant(now.date_naive(), cutoff_hour, *now.offset()) {
        Some(cutoff) => now >= cutoff,
        None => true,
    }
}

/// Is `date` bookable at `now`?
///
/// Never fails: dates before today, and cutoffs that cannot be computed,
/// count as closed.
pub fn is_available(
    date: NaiveDate,
    now: DateTime<FixedOffset>,
    record: Option<&BookingDate>,
    cutoff_hour: u32,
) -> bool {
    let today = now.date_naive();
    if date < today {
        return false;
    }

    let (is_open, force_open) = record
        .map(|r| (r.is_open, r.force_open))
        .unwrap_or((true, false));

    if date == today && is_past_cutoff(now, cutoff_hour) {
        return force_open;
    }

    is_open || force_open
}

/// Parse a `YYYY-MM-DD` date, None when malformed
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn wib() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        wib().with_ymd_and_hms(2026, 3, 15, hour, minute, 0).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    fn record(date: NaiveDate, is_open: bool, force_open: bool) -> BookingDate {
        BookingDate {
            id: 1,
            date,
            is_open,
            force_open,
            note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_no_record_is_open_before_cutoff() {
        assert!(is_available(today(), at(14, 59), None, 15));
    }

    #[test]
    fn test_same_day_closes_at_cutoff() {
        assert!(!is_available(today(), at(15, 0), None, 15));
        assert!(!is_available(today(), at(21, 30), None, 15));
    }

    #[test]
    fn test_force_open_overrides_cutoff() {
        let rec = record(today(), true, true);
        assert!(is_available(today(), at(15, 0), Some(&rec), 15));
    }

    #[test]
    fn test_force_open_overrides_closed_flag_after_cutoff() {
        let rec = record(today(), false, true);
        assert!(is_available(today(), at(18, 0), Some(&rec), 15));
    }

    #[test]
    fn test_closed_date_stays_closed_before_cutoff() {
        let rec = record(today(), false, false);
        assert!(!is_available(today(), at(9, 0), Some(&rec), 15));
    }

    #[test]
    fn test_future_date_unaffected_by_hour() {
        let tomorrow = today().succ_opt().unwrap();
        assert!(is_available(tomorrow, at(23, 59), None, 15));
        let closed = record(tomorrow, false, false);
        assert!(!is_available(tomorrow, at(8, 0), Some(&closed), 15));
        let forced = record(tomorrow, false, true);
        assert!(is_available(tomorrow, at(8, 0), Some(&forced), 15));
    }

    #[test]
    fn test_past_dates_are_closed() {
        let yesterday = today().pred_opt().unwrap();
        let forced = record(yesterday, true, true);
        assert!(!is_available(yesterday, at(8, 0), Some(&forced), 15));
    }

    #[test]
    fn test_cutoff_uses_service_timezone() {
        // 08:00 UTC is 15:00 WIB
        let utc_now = Utc.with_ymd_and_hms(2026, 3, 15, 8, 0, 0).unwrap();
        let now = utc_now.with_timezone(&wib());
        assert!(!is_available(today(), now, None, 15));

        let earlier = Utc
            .with_ymd_and_hms(2026, 3, 15, 7, 59, 0)
            .unwrap()
            .with_timezone(&wib());
        assert!(is_available(today(), earlier, None, 15));
    }

    #[test]
    fn test_is_past_cutoff() {
        assert!(!is_past_cutoff(at(14, 59), 15));
        assert!(is_past_cutoff(at(15, 0), 15));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2026-03-15"), Some(today()));
        assert_eq!(parse_date("15/03/2026"), None);
        assert_eq!(parse_date("2026-02-30"), None);
    }
}
