use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use price_forecast::data::{Frequency, LoaderConfig, SeriesLoader, SeriesWindow, TimeSeries};
use price_forecast::error::ForecastError;
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

fn day(d: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(d)
}

fn daily_series(values: &[f64]) -> TimeSeries {
    let timestamps = (0..values.len() as i64).map(day).collect();
    TimeSeries::new(timestamps, values.to_vec()).unwrap()
}

fn csv_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

#[test]
fn test_loader_from_csv() {
    let file = csv_file(&[
        "date,close",
        "2023-01-01,100.0",
        "2023-01-02,103.0",
        "2023-01-03,106.0",
    ]);

    let loaded = SeriesLoader::default().from_csv(file.path()).unwrap();

    assert_eq!(loaded.series.len(), 3);
    assert_eq!(loaded.series.values(), &[100.0, 103.0, 106.0]);
    assert_eq!(loaded.series.frequency(), Frequency::Daily);
    assert_eq!(loaded.report.rows_read, 3);
    assert_eq!(loaded.report.dropped_rows(), 0);
}

#[test]
fn test_unparseable_timestamp_is_dropped_and_counted() {
    let file = csv_file(&[
        "date,price",
        "2023-01-01,100.0",
        "2023-01-02,102.0",
        "2023-01-03,101.0",
        "not a date,999.0",
        "2023-01-05,102.0",
        "2023-01-06,104.0",
        "2023-01-07,103.0",
        "2023-01-08,105.0",
        "2023-01-09,104.0",
        "2023-01-10,106.0",
    ]);

    let loaded = SeriesLoader::default().load(file.path()).unwrap();

    assert_eq!(loaded.series.len(), 9);
    assert_eq!(loaded.report.invalid_timestamps, 1);
    assert_eq!(loaded.report.dropped_rows(), 1);
    assert!(!loaded.series.values().contains(&999.0));
}

#[test]
fn test_missing_and_non_numeric_values_are_dropped_not_zeroed() {
    let file = csv_file(&[
        "date,price",
        "2023-01-01,100.0",
        "2023-01-02,",
        "2023-01-03,abc",
        "2023-01-04,101.5",
    ]);

    let loaded = SeriesLoader::default().load(file.path()).unwrap();

    assert_eq!(loaded.series.values(), &[100.0, 101.5]);
    assert_eq!(loaded.report.invalid_values, 2);
}

#[test]
fn test_unsorted_rows_with_duplicates() {
    let file = csv_file(&[
        "timestamp,value",
        "2023-01-03,3.0",
        "2023-01-01,1.0",
        "2023-01-02,2.0",
        "2023-01-02,2.5",
    ]);

    let loaded = SeriesLoader::default().load(file.path()).unwrap();

    assert_eq!(loaded.series.values(), &[1.0, 2.5, 3.0]);
    assert_eq!(loaded.report.duplicates_replaced, 1);
    assert!(loaded
        .series
        .timestamps()
        .windows(2)
        .all(|w| w[0] < w[1]));
}

#[test]
fn test_intraday_timestamps() {
    let file = csv_file(&[
        "time,price",
        "2024-03-01 09:00:00,80.0",
        "2024-03-01 10:00:00,80.5",
        "2024-03-01T11:00:00Z,81.0",
    ]);

    let loaded = SeriesLoader::default().load(file.path()).unwrap();

    assert_eq!(loaded.series.len(), 3);
    assert_eq!(loaded.series.frequency(), Frequency::Hourly);
}

#[test]
fn test_configured_columns_and_frequency() {
    let file = csv_file(&[
        "when,settle,volume",
        "2024-01-01,70.0,10",
        "2024-01-08,71.0,12",
    ]);

    let config = LoaderConfig::with_columns("when", "settle").with_frequency(Frequency::Weekly);
    let loaded = SeriesLoader::new(config).load(file.path()).unwrap();

    assert_eq!(loaded.series.values(), &[70.0, 71.0]);
    assert_eq!(loaded.series.frequency(), Frequency::Weekly);
}

#[test]
fn test_missing_file_is_data_unavailable() {
    let result = SeriesLoader::default().load("definitely/not/here.csv");
    assert!(matches!(result, Err(ForecastError::DataUnavailable(_))));
}

#[test]
fn test_no_usable_rows_is_data_invalid() {
    let file = csv_file(&["date,price", "garbage,1.0", "2023-01-02,n/a"]);

    let result = SeriesLoader::default().load(file.path());
    assert!(matches!(result, Err(ForecastError::DataInvalid(_))));
}

#[test]
fn test_unrecognised_header_is_data_invalid() {
    let file = csv_file(&["foo,bar", "1,2"]);

    let result = SeriesLoader::default().load(file.path());
    assert!(matches!(result, Err(ForecastError::DataInvalid(_))));
}

#[rstest]
#[case(3, vec![3.0, 4.0, 5.0])]
#[case(10, vec![1.0, 2.0, 3.0, 4.0, 5.0])]
#[case(0, vec![])]
fn test_tail(#[case] n: usize, #[case] expected: Vec<f64>) {
    let series = daily_series(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(SeriesWindow::tail(&series, n).values(), expected.as_slice());
}

#[test]
fn test_since_cutoff_is_inclusive() {
    let series = daily_series(&[1.0, 2.0, 3.0, 4.0, 5.0]);

    let window = SeriesWindow::since(&series, day(4), Duration::days(2));

    assert_eq!(window.values(), &[3.0, 4.0, 5.0]);
    assert_eq!(series.len(), 5);
}

#[test]
fn test_since_past_the_end_is_empty() {
    let series = daily_series(&[1.0, 2.0, 3.0]);

    let window = SeriesWindow::since(&series, day(30), Duration::days(1));

    assert!(window.is_empty());
}

#[test]
fn test_last_days() {
    let values: Vec<f64> = (0..60).map(|i| i as f64).collect();
    let series = daily_series(&values);

    let window = SeriesWindow::last_days(&series, 30);

    assert_eq!(window.len(), 31);
    assert_eq!(window.first_timestamp(), Some(day(29)));
    assert_eq!(window.last_value(), Some(59.0));
}

#[test]
fn test_split_holdout() {
    let series = daily_series(&[1.0, 2.0, 3.0, 4.0, 5.0]);

    let (train, holdout) = SeriesWindow::split_holdout(&series, 2).unwrap();
    assert_eq!(train.values(), &[1.0, 2.0, 3.0]);
    assert_eq!(holdout.values(), &[4.0, 5.0]);

    assert!(matches!(
        SeriesWindow::split_holdout(&series, 5),
        Err(ForecastError::InvalidParameter(_))
    ));
    assert!(SeriesWindow::split_holdout(&series, 0).is_err());
}

#[test]
fn test_series_statistics() {
    let series = daily_series(&[100.0, 103.0, 106.0]);

    let mean = series.mean().unwrap();
    assert!(mean > 102.0 && mean < 104.0);

    let std_dev = series.std_dev().unwrap();
    assert!(std_dev > 2.0 && std_dev < 4.0);
}
