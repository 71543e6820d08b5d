//! Time and timestamp utilities

use chrono::{DateTime, NaiveDateTime, Utc};

/// Format used in backup filenames: sortable, filesystem-safe, microsecond precision
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

/// Current time in UTC
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as an RFC 3339 string (used for envelope timestamps)
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Render a time for use inside a backup filename
pub fn backup_timestamp(time: &DateTime<Utc>) -> String {
    time.format(BACKUP_TIMESTAMP_FORMAT).to_string()
}

/// Parse an RFC 3339 timestamp, returning `None` for anything else
pub fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a timestamp produced by [`backup_timestamp`]
pub fn parse_backup_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, BACKUP_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Age of `time` relative to `now` in fractional days (never negative)
pub fn age_days(time: &DateTime<Utc>, now: &DateTime<Utc>) -> f64 {
    let seconds = (*now - *time).num_seconds().max(0);
    seconds as f64 / 86_400.0
}
