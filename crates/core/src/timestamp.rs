//! Timestamp and date text encoding used by the persisted layout.
//!
//! Instants are stored as fixed-width RFC 3339 UTC strings with microsecond
//! precision so that lexical order equals chronological order.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::error::DataError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Encode an instant for storage (`2024-01-10T00:00:00.000000Z`).
pub fn format(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a stored instant. Accepts any RFC 3339 offset and normalises to UTC.
pub fn parse(value: &str) -> Result<DateTime<Utc>, DataError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DataError::Timestamp {
            value: value.to_string(),
        })
}

pub fn parse_opt(value: Option<&str>) -> Result<Option<DateTime<Utc>>, DataError> {
    value.map(parse).transpose()
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Result<NaiveDate, DataError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| DataError::Date {
        value: value.to_string(),
    })
}
