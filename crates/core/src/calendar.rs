//! Business-day arithmetic for response deadlines.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Weekday};

/// Monday through Friday.
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Weekdays left before `expires_at`, as shown to the person holding the link.
///
/// Counts every Monday–Friday date after `now`'s date, up to and including
/// `expires_at`'s date. Dates are taken in the time zone of the inputs, so the
/// caller picks the business calendar. No expiry, or an expiry at or before
/// `now`, yields 0.
pub fn remaining_business_days<Tz: TimeZone>(
    now: &DateTime<Tz>,
    expires_at: Option<&DateTime<Tz>>,
) -> u32 {
    let Some(expires_at) = expires_at else {
        return 0;
    };
    if expires_at <= now {
        return 0;
    }

    let last = expires_at.date_naive();
    let days = now
        .date_naive()
        .iter_days()
        .skip(1)
        .take_while(|day| *day <= last)
        .filter(|day| is_business_day(*day))
        .count();
    u32::try_from(days).unwrap_or(u32::MAX)
}
