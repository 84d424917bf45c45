//! iCal date and date-time values

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::error::CompletionError;

/// Parse an iCal `DATE` (`YYYYMMDD`) or `DATE-TIME` (`YYYYMMDDTHHMMSS`, optionally followed by `Z`).
///
/// Every value is read as UTC, whether or not it carries the `Z` suffix.
/// Date-only values are at midnight.
pub fn parse_ics_date(value: &str) -> Result<DateTime<Utc>, CompletionError> {
    let value = value.trim();
    let naive = match value.contains('T') {
        true => {
            let floating = value.strip_suffix('Z').unwrap_or(value);
            NaiveDateTime::parse_from_str(floating, "%Y%m%dT%H%M%S")
        },
        false => NaiveDate::parse_from_str(value, "%Y%m%d")
            .map(|date| date.and_time(NaiveTime::MIN)),
    }.map_err(|_| CompletionError::InvalidDate(value.to_string()))?;

    Ok(Utc.from_utc_datetime(&naive))
}

/// Tells whether `value` looks like an absolute `DATE` or `DATE-TIME` (rather than e.g. a duration)
pub fn is_ics_date(value: &str) -> bool {
    parse_ics_date(value).is_ok()
}

/// Format as an iCal UTC `DATE-TIME`, e.g. `20240101T090000Z`
pub fn format_ics_date(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format as an iCal `DATE`, e.g. `20240101`
pub fn format_ics_date_only(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%d").to_string()
}
