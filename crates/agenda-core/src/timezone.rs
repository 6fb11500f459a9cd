use crate::error::CoreError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Parse an IANA timezone name
pub fn parse_timezone(timezone: &str) -> Result<Tz, CoreError> {
    Tz::from_str(timezone.trim())
        .map_err(|_| CoreError::InvalidTimezone(timezone.to_string()))
}

/// Validate IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<(), CoreError> {
    parse_timezone(timezone).map(|_| ())
}

/// Reinterpret the UTC wall-clock reading of `instant` as a local time in
/// `tz` and return the resulting instant.
///
/// Recurrence rules are evaluated with a UTC anchor, so an occurrence at
/// `09:00Z` means "09:00 on that day" for the viewer. A 09:00 occurrence
/// viewed from `America/New_York` becomes `14:00Z` (or `13:00Z` in summer).
pub fn reinterpret_in_timezone(instant: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let wall_clock = instant.naive_utc();

    match tz.from_local_datetime(&wall_clock).earliest() {
        Some(local_dt) => local_dt.with_timezone(&Utc),
        None => {
            // Time doesn't exist (spring forward) - move to next valid time
            let shifted = wall_clock + Duration::hours(1);
            match tz.from_local_datetime(&shifted).earliest() {
                Some(local_dt) => local_dt.with_timezone(&Utc),
                None => instant,
            }
        }
    }
}

/// Parse an ISO-8601 timestamp as sent by clients.
///
/// Accepts RFC 3339 (`2024-01-01T00:00:00.000Z`, `2024-01-01T02:00:00+02:00`),
/// a date-time without offset (read as UTC), or a bare date (midnight UTC).
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, CoreError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(CoreError::InvalidInput(format!("Invalid timestamp: '{}'", value)))
}

/// Format an instant the way JavaScript's `toISOString` does
pub fn to_iso_string(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
