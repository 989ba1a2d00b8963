//! Timestamp parsing for loosely formatted source records.
//!
//! Source systems hand us receipt and production timestamps in several
//! shapes. Everything is reduced to a local-calendar `NaiveDateTime` in the
//! report's UTC offset, which is what window filtering and FIFO ordering
//! compare against.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

/// Offset-carrying formats, tried after RFC 3339.
///
/// `%#z` accepts `+00`, `+0000` and `+00:00`, which covers `PostgreSQL`'s
/// text rendering of `timestamptz`.
const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

/// Formats without an offset; interpreted as already local.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp string into local calendar time.
///
/// Accepted shapes, in order:
/// - RFC 3339 (`2025-05-15T10:00:00Z`, `2025-05-15T10:00:00-03:00`)
/// - `PostgreSQL` style with offset (`2025-05-15 10:00:00+00`)
/// - naive date-time (`2025-05-15 10:00:00`, `2025-05-15T10:00`)
/// - date only (`2025-05-15`), meaning local midnight
///
/// Zoned inputs are converted into `offset`; naive inputs are taken as-is.
/// Returns `None` when nothing matches.
#[must_use]
pub fn parse_timestamp(input: &str, offset: FixedOffset) -> Option<NaiveDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&offset).naive_local());
    }

    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(input, format) {
            return Some(dt.with_timezone(&offset).naive_local());
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn local(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_parse_rfc3339_converts_to_offset() {
        let brt = FixedOffset::west_opt(3 * 3600).unwrap();
        let parsed = parse_timestamp("2025-06-01T02:30:00Z", brt).unwrap();
        assert_eq!(parsed, local("2025-05-31 23:30:00"));
    }

    #[test]
    fn test_parse_postgres_text_offset() {
        let parsed = parse_timestamp("2025-05-15 10:00:00+00", utc()).unwrap();
        assert_eq!(parsed, local("2025-05-15 10:00:00"));
    }

    #[test]
    fn test_parse_postgres_fractional_seconds() {
        let parsed = parse_timestamp("2025-05-15 10:00:00.123456+00:00", utc()).unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2025, 5, 15).unwrap());
    }

    #[test]
    fn test_parse_naive_is_local() {
        let brt = FixedOffset::west_opt(3 * 3600).unwrap();
        let parsed = parse_timestamp("2025-05-15 23:59:59", brt).unwrap();
        assert_eq!(parsed, local("2025-05-15 23:59:59"));
    }

    #[test]
    fn test_parse_date_only_is_midnight() {
        let parsed = parse_timestamp("2025-05-01", utc()).unwrap();
        assert_eq!(parsed, local("2025-05-01 00:00:00"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timestamp("", utc()).is_none());
        assert!(parse_timestamp("yesterday", utc()).is_none());
        assert!(parse_timestamp("2025-13-45", utc()).is_none());
    }
}
