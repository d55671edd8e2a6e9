//! Timestamp utilities
//!
//! Every persisted timestamp is a UTC ISO-8601 string with millisecond
//! precision (`2025-06-01T10:00:00.000Z`). The fixed width keeps textual
//! ordering identical to chronological ordering, which the snapshot
//! queries rely on.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::{Error, Result};

/// Date format used for logical days (`YYYY-MM-DD`)
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("Invalid timestamp '{}': {}", s, e)))
}

/// Format a logical day for storage
pub fn format_day(day: &NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Parse a logical day (`YYYY-MM-DD`)
pub fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DAY_FORMAT)
        .map_err(|e| Error::InvalidInput(format!("Invalid day '{}': {}", s, e)))
}

/// Elapsed milliseconds between two timestamps, clamped at zero
pub fn duration_ms(start: &DateTime<Utc>, end: &DateTime<Utc>) -> i64 {
    (*end - *start).num_milliseconds().max(0)
}

/// Yesterday in UTC, the default day for the daily job
pub fn yesterday() -> NaiveDate {
    (Utc::now() - chrono::Duration::days(1)).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp_has_millis_and_z() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2025-06-01T10:00:00.000Z");
    }

    #[test]
    fn test_timestamp_text_order_matches_time_order() {
        let early = Utc.with_ymd_and_hms(2025, 6, 1, 9, 59, 59).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap();
        assert!(format_timestamp(&early) < format_timestamp(&late));
    }

    #[test]
    fn test_parse_timestamp_accepts_offsets() {
        let parsed = parse_timestamp("2025-06-01T12:00:00+02:00").unwrap();
        assert_eq!(format_timestamp(&parsed), "2025-06-01T10:00:00.000Z");
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(matches!(parse_timestamp("yesterday"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_day_roundtrip_and_rejection() {
        let day = parse_day("2025-06-01").unwrap();
        assert_eq!(format_day(&day), "2025-06-01");
        assert!(parse_day("2025-13-01").is_err());
    }

    #[test]
    fn test_duration_ms_never_negative() {
        let a = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let b = a + chrono::Duration::milliseconds(1500);
        assert_eq!(duration_ms(&a, &b), 1500);
        assert_eq!(duration_ms(&b, &a), 0);
    }
}
