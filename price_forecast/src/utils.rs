//! Utility functions for the price_forecast crate

use crate::data::Frequency;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};

/// Create future timestamps for forecasting, each counted in whole steps from the last one observed
pub fn future_timestamps(
    last_timestamp: DateTime<Utc>,
    horizon: usize,
    frequency: Frequency,
) -> Result<Vec<DateTime<Utc>>> {
    (1..=horizon)
        .map(|k| {
            u32::try_from(k)
                .ok()
                .and_then(|steps| frequency.advance(last_timestamp, steps))
                .ok_or_else(|| {
                    ForecastError::ValidationError(format!(
                        "Timestamp overflow while extending {} by {} steps",
                        last_timestamp, horizon
                    ))
                })
        })
        .collect()
}

/// Parsing of the date and timestamp formats accepted in tabular sources
pub mod date_parser {
    use crate::error::{ForecastError, Result};
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

    /// Parse a date-only or full timestamp string into UTC
    pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
        let raw = raw.trim();

        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(ts.with_timezone(&Utc));
        }

        for format in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
            }
        }

        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
                let naive = NaiveDateTime::new(date, chrono::NaiveTime::default());
                return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
            }
        }

        Err(ForecastError::ValidationError(format!(
            "Unrecognised timestamp: '{}'",
            raw
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::date_parser::parse_timestamp;
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_supported_formats() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let afternoon = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();

        assert_eq!(parse_timestamp("2024-03-05").unwrap(), midnight);
        assert_eq!(parse_timestamp("2024/03/05").unwrap(), midnight);
        assert_eq!(parse_timestamp(" 2024-03-05 ").unwrap(), midnight);
        assert_eq!(parse_timestamp("2024-03-05 14:30:00").unwrap(), afternoon);
        assert_eq!(parse_timestamp("2024-03-05T14:30:00").unwrap(), afternoon);
        assert_eq!(parse_timestamp("2024-03-05 14:30").unwrap(), afternoon);
        assert_eq!(parse_timestamp("2024-03-05 14:30:00.000").unwrap(), afternoon);
        assert_eq!(parse_timestamp("2024-03-05T16:30:00+02:00").unwrap(), afternoon);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timestamp("not a date").is_err());
        assert!(parse_timestamp("2024-13-45").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_future_timestamps() {
        let last = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let steps = future_timestamps(last, 3, Frequency::Daily).unwrap();

        assert_eq!(
            steps,
            vec![
                Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap(),
            ]
        );

        assert!(future_timestamps(last, 0, Frequency::Hourly).unwrap().is_empty());
    }

    #[test]
    fn test_future_timestamps_overflow() {
        let last = DateTime::<Utc>::MAX_UTC - chrono::Duration::days(1);
        assert!(future_timestamps(last, 3, Frequency::Monthly).is_err());
    }
}
