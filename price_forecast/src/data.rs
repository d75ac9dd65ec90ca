//! Time series data handling for forecasting

pub mod loader;
pub mod window;

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, Months, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

pub use loader::{LoadReport, LoadedSeries, LoaderConfig, SeriesLoader};
pub use window::SeriesWindow;

/// Step unit between consecutive observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Minute,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    /// Timestamp `steps` units after `from`, or `None` past the representable range.
    ///
    /// Calendar units count months from `from` itself; a month-end origin
    /// stays on each month's last day.
    pub fn advance(&self, from: DateTime<Utc>, steps: u32) -> Option<DateTime<Utc>> {
        let fixed = |unit_seconds: i64| {
            let offset = Duration::seconds(unit_seconds * i64::from(steps));
            from.checked_add_signed(offset)
        };
        let months = |per_step: u32| {
            let total = per_step.checked_mul(steps)?;
            from.checked_add_months(Months::new(total))
        };

        match self {
            Frequency::Minute => fixed(60),
            Frequency::Hourly => fixed(3_600),
            Frequency::Daily => fixed(86_400),
            Frequency::Weekly => fixed(604_800),
            Frequency::Monthly => months(1),
            Frequency::Quarterly => months(3),
            Frequency::Yearly => months(12),
        }
    }

    /// Infer the step unit from the smallest positive gap between timestamps.
    ///
    /// Gaps of 365 days or more are yearly, 89 days quarterly, 28 days
    /// monthly, a week weekly, a day daily, an hour hourly, anything shorter
    /// minute-level. A single observation is daily.
    pub fn infer(timestamps: &[DateTime<Utc>]) -> Frequency {
        let smallest_gap = timestamps
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|gap| *gap > Duration::zero())
            .min();

        match smallest_gap {
            Some(gap) if gap >= Duration::days(365) => Frequency::Yearly,
            Some(gap) if gap >= Duration::days(89) => Frequency::Quarterly,
            Some(gap) if gap >= Duration::days(28) => Frequency::Monthly,
            Some(gap) if gap >= Duration::weeks(1) => Frequency::Weekly,
            Some(gap) if gap >= Duration::days(1) => Frequency::Daily,
            Some(gap) if gap >= Duration::hours(1) => Frequency::Hourly,
            Some(_) => Frequency::Minute,
            None => Frequency::Daily,
        }
    }
}

/// Ordered, validated price series
///
/// Timestamps are strictly increasing and every value is finite. A series
/// is never modified in place; windows and fits work on copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
    frequency: Option<Frequency>,
}

impl TimeSeries {
    /// Create a new TimeSeries from timestamps and values
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::ValidationError(format!(
                "Timestamps length ({}) doesn't match values length ({})",
                timestamps.len(),
                values.len()
            )));
        }

        if let Some(pos) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ForecastError::ValidationError(format!(
                "Timestamps must be strictly increasing: {} is followed by {}",
                timestamps[pos],
                timestamps[pos + 1]
            )));
        }

        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::ValidationError(format!(
                "Value at {} is not finite",
                timestamps[pos]
            )));
        }

        Ok(Self {
            timestamps,
            values,
            frequency: None,
        })
    }

    /// Override the step unit instead of inferring it from the timestamps
    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// Get the timestamps
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Get the values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterate over `(timestamp, value)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }

    /// Step unit: the explicit override, or one inferred from the timestamps
    pub fn frequency(&self) -> Frequency {
        self.frequency
            .unwrap_or_else(|| Frequency::infer(&self.timestamps))
    }

    /// Timestamp of the first observation
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.first().copied()
    }

    /// Timestamp of the last observation
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// Value of the last observation
    pub fn last_value(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Check if the time series is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the length of the time series
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Copy of the observations in `start..end`, keeping the frequency override
    pub(crate) fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.len());
        let start = start.min(end);

        Self {
            timestamps: self.timestamps[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
            frequency: self.frequency,
        }
    }

    /// Calculate the mean of the values
    pub fn mean(&self) -> Result<f64> {
        forecast_math::stats::mean(&self.values).map_err(|_| {
            ForecastError::DataInvalid("No values available".to_string())
        })
    }

    /// Calculate the standard deviation of the values
    pub fn std_dev(&self) -> Result<f64> {
        forecast_math::stats::std_dev(&self.values).map_err(|_| {
            ForecastError::DataInvalid("No values available".to_string())
        })
    }

    /// Export as a DataFrame with `timestamp` and `value` columns
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let millis: Vec<i64> = self.timestamps.iter().map(|t| t.timestamp_millis()).collect();
        let timestamps = Series::new("timestamp", millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        let values = Series::new("value", self.values.clone());

        Ok(DataFrame::new(vec![timestamps, values])?)
    }
}
