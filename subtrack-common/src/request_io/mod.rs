mod inputs;
mod outputs;

pub use inputs::*;
pub use outputs::*;

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use std::time::SystemTime;

/// Accepts either an RFC 3339 datetime or a bare `YYYY-MM-DD` date (taken as
/// midnight UTC).
pub fn parse_date_or_datetime(value: &str) -> Option<SystemTime> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(SystemTime::from(datetime.with_timezone(&Utc)));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let datetime = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?);

    Some(SystemTime::from(datetime))
}

pub fn format_timestamp(timestamp: SystemTime) -> String {
    DateTime::<Utc>::from(timestamp).to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    #[test]
    fn test_parse_date_or_datetime() {
        let expected = SystemTime::from(Utc.with_ymd_and_hms(2026, 9, 3, 0, 0, 0).single().unwrap());
        assert_eq!(parse_date_or_datetime("2026-09-03"), Some(expected));
        assert_eq!(parse_date_or_datetime("2026-09-03T00:00:00Z"), Some(expected));
        assert_eq!(
            parse_date_or_datetime("2026-09-03T02:00:00+02:00"),
            Some(expected),
        );

        assert_eq!(parse_date_or_datetime("next tuesday"), None);
        assert_eq!(parse_date_or_datetime("2026-13-40"), None);
        assert_eq!(parse_date_or_datetime(""), None);
    }

    #[test]
    fn test_format_timestamp_round_trips() {
        let timestamp =
            SystemTime::from(Utc.with_ymd_and_hms(2026, 9, 3, 14, 30, 15).single().unwrap());
        let formatted = format_timestamp(timestamp);

        assert_eq!(formatted, "2026-09-03T14:30:15Z");
        assert_eq!(parse_date_or_datetime(&formatted), Some(timestamp));
    }
}
