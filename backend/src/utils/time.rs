use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Parses a client-supplied timestamp into a UTC instant.
///
/// RFC 3339 values keep their offset; a bare `YYYY-MM-DDTHH:MM:SS[.fff]` is read as UTC.
pub fn parse_client_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Renders an instant in the configured timezone for human-facing messages.
pub fn format_local(instant: DateTime<Utc>, tz: &Tz) -> String {
    instant
        .with_timezone(tz)
        .format("%Y-%m-%d %H:%M %Z")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_and_normalizes_offset() {
        let parsed = parse_client_timestamp("2024-01-01T09:00:00+09:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn parses_naive_timestamp_as_utc() {
        let parsed = parse_client_timestamp("2024-01-01T00:00:00.250").unwrap();
        assert_eq!(parsed.timestamp_millis(), 1_704_067_200_250);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_client_timestamp("yesterday").is_none());
        assert!(parse_client_timestamp("").is_none());
    }

    #[test]
    fn format_local_uses_timezone_abbreviation() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            format_local(instant, &chrono_tz::Asia::Tokyo),
            "2024-01-01 09:00 JST"
        );
        assert_eq!(format_local(instant, &chrono_tz::UTC), "2024-01-01 00:00 UTC");
    }
}
