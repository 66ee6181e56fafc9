//! Timestamp parsing shared by `cast` and `validate_schema`.
//!
//! Timestamps travel through tables as ISO 8601 text. Parsing accepts the
//! common interchange formats and normalizes to `YYYY-MM-DDTHH:MM:SS`
//! (date-only values stay `YYYY-MM-DD`).

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y"];

/// Parse a timestamp string, returning normalized ISO 8601 text.
pub fn parse_timestamp(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_formats() {
        assert_eq!(
            parse_timestamp("2024-03-01T10:30:00Z").as_deref(),
            Some("2024-03-01T10:30:00")
        );
        assert_eq!(
            parse_timestamp("2024-03-01 10:30:00").as_deref(),
            Some("2024-03-01T10:30:00")
        );
        assert_eq!(
            parse_timestamp("2024-03-01").as_deref(),
            Some("2024-03-01")
        );
        assert_eq!(
            parse_timestamp("03/15/2024").as_deref(),
            Some("2024-03-15")
        );
    }

    #[test]
    fn rejects_unparseable_values() {
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("2024-13-40"), None);
    }
}
