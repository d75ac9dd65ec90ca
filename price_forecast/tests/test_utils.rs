use chrono::{Duration, TimeZone, Utc};
use price_forecast::data::Frequency;
use price_forecast::utils::{date_parser, future_timestamps};
use rstest::rstest;

#[rstest]
#[case("2024-03-01", Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())]
#[case("2024/03/01", Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())]
#[case("2024-03-01 14:30", Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap())]
#[case("2024-03-01 14:30:15", Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 15).unwrap())]
#[case("2024-03-01T14:30:15", Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 15).unwrap())]
#[case("2024-03-01T14:30:15+02:00", Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 15).unwrap())]
#[case(" 2024-03-01 ", Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())]
fn test_parse_timestamp(#[case] raw: &str, #[case] expected: chrono::DateTime<Utc>) {
    assert_eq!(date_parser::parse_timestamp(raw).unwrap(), expected);
}

#[rstest]
#[case("")]
#[case("yesterday")]
#[case("2024-13-01")]
#[case("01/03/2024")]
fn test_parse_timestamp_rejects(#[case] raw: &str) {
    assert!(date_parser::parse_timestamp(raw).is_err());
}

#[rstest]
#[case(Frequency::Minute, Duration::minutes(1))]
#[case(Frequency::Hourly, Duration::hours(1))]
#[case(Frequency::Daily, Duration::days(1))]
#[case(Frequency::Weekly, Duration::weeks(1))]
fn test_future_timestamps(#[case] frequency: Frequency, #[case] step: Duration) {
    let last = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

    let timestamps = future_timestamps(last, 3, frequency).unwrap();

    assert_eq!(timestamps, vec![last + step, last + step * 2, last + step * 3]);
}

#[rstest]
#[case(Frequency::Monthly, [(2024, 2, 29), (2024, 3, 31), (2024, 4, 30)])]
#[case(Frequency::Quarterly, [(2024, 4, 30), (2024, 7, 31), (2024, 10, 31)])]
#[case(Frequency::Yearly, [(2025, 1, 31), (2026, 1, 31), (2027, 1, 31)])]
fn test_future_timestamps_calendar_units(
    #[case] frequency: Frequency,
    #[case] expected: [(i32, u32, u32); 3],
) {
    let last = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();

    let timestamps = future_timestamps(last, 3, frequency).unwrap();

    let expected: Vec<_> = expected
        .iter()
        .map(|&(y, m, d)| Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap())
        .collect();
    assert_eq!(timestamps, expected);
}
