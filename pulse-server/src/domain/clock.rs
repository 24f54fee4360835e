//! Logical-day clock.
//!
//! Late-night buses belong to the previous day's service, so the day
//! boundary is shifted: 00:00–03:59 counts as the previous logical day.
//! Minute-of-day, on the other hand, is read from the unshifted wall clock
//! so that bucketed statistics line up with the times printed on a timetable.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

/// Hours subtracted from a timestamp before taking its date.
pub const LOGICAL_DAY_OFFSET_HOURS: i64 = 4;

/// Minutes in a day; valid minute-of-day values are below this.
pub const MINUTES_PER_DAY: u32 = 1440;

/// The logical date a timestamp belongs to.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use pulse_server::domain::logical_date;
///
/// let two_am = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(2, 0, 0).unwrap();
/// assert_eq!(logical_date(two_am), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
/// ```
pub fn logical_date(ts: NaiveDateTime) -> NaiveDate {
    logical_date_with_offset(ts, LOGICAL_DAY_OFFSET_HOURS)
}

/// The logical date with a custom day-boundary offset.
pub fn logical_date_with_offset(ts: NaiveDateTime, offset_hours: i64) -> NaiveDate {
    ts.checked_sub_signed(Duration::hours(offset_hours))
        .unwrap_or(ts)
        .date()
}

/// Storage key form of a logical date (`YYYY-MM-DD`).
pub fn logical_date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Wall-clock minute of day, 0–1439. Not shifted by the logical-day offset.
pub fn minute_of_day(ts: NaiveDateTime) -> u32 {
    ts.hour() * 60 + ts.minute()
}
