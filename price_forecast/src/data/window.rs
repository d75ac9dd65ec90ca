//! Bounded, non-mutating views over a series

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, Utc};

/// Windowing operations over a loaded series
#[derive(Debug)]
pub struct SeriesWindow;

impl SeriesWindow {
    /// The `min(n, len)` most recent observations, in original order
    pub fn tail(series: &TimeSeries, n: usize) -> TimeSeries {
        let start = series.len().saturating_sub(n);
        series.slice(start, series.len())
    }

    /// Observations at or after `reference_time - duration`.
    ///
    /// A cutoff past the last observation yields an empty series.
    pub fn since(
        series: &TimeSeries,
        reference_time: DateTime<Utc>,
        duration: Duration,
    ) -> TimeSeries {
        let cutoff = reference_time - duration;
        let start = series.timestamps().partition_point(|ts| *ts < cutoff);
        series.slice(start, series.len())
    }

    /// Observations within `days` calendar days of the last observation
    pub fn last_days(series: &TimeSeries, days: i64) -> TimeSeries {
        match series.last_timestamp() {
            Some(last) => Self::since(series, last, Duration::days(days)),
            None => series.clone(),
        }
    }

    /// Split into a training prefix and the final `holdout` observations
    pub fn split_holdout(series: &TimeSeries, holdout: usize) -> Result<(TimeSeries, TimeSeries)> {
        if holdout == 0 || holdout >= series.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Holdout must be between 1 and {} for a series of {} observations, got {}",
                series.len().saturating_sub(1),
                series.len(),
                holdout
            )));
        }

        let split = series.len() - holdout;
        Ok((series.slice(0, split), series.slice(split, series.len())))
    }
}
