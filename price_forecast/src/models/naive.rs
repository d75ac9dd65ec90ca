//! Naive shift model: the last observation carried forward

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{FittedForecastModel, ForecastModel, ForecastOrigin};
use crate::result::ForecastResult;
use serde::{Deserialize, Serialize};

const MODEL_NAME: &str = "Naive Shift";

/// Flat-line extrapolation of the last observed value
#[derive(Debug, Clone, Default)]
pub struct NaiveShift;

/// Fitted naive shift model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedNaiveShift {
    origin: ForecastOrigin,
    last_value: f64,
}

impl NaiveShift {
    /// Create a new naive shift model
    pub fn new() -> Self {
        Self
    }

    /// One-step-ahead in-sample predictions: each observation predicted by its predecessor.
    ///
    /// The first observation has no predecessor and maps to `None`.
    pub fn fitted_values(series: &TimeSeries) -> Vec<Option<f64>> {
        std::iter::once(None)
            .chain(series.values().iter().map(|v| Some(*v)))
            .take(series.len())
            .collect()
    }
}

impl ForecastModel for NaiveShift {
    type Fitted = FittedNaiveShift;

    fn fit(&self, series: &TimeSeries) -> Result<Self::Fitted> {
        self.check_observations(series)?;

        let last_value = series.last_value().ok_or_else(|| {
            ForecastError::DataInvalid("Empty time series data".to_string())
        })?;

        Ok(FittedNaiveShift {
            origin: ForecastOrigin::of(series)?,
            last_value,
        })
    }

    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn min_observations(&self) -> usize {
        1
    }
}

impl FittedNaiveShift {
    /// The value every forecast step repeats
    pub fn last_value(&self) -> f64 {
        self.last_value
    }
}

impl FittedForecastModel for FittedNaiveShift {
    fn predict(&self, horizon: usize) -> Result<ForecastResult> {
        let timestamps = self.origin.future_timestamps(horizon)?;
        let values = vec![self.last_value; horizon];

        ForecastResult::new(MODEL_NAME, timestamps, values)
    }

    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn origin(&self) -> &ForecastOrigin {
        &self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_fitted_values_shift_by_one() {
        let timestamps = (1..=3)
            .map(|d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap())
            .collect();
        let series = TimeSeries::new(timestamps, vec![1.0, 2.0, 3.0]).unwrap();

        assert_eq!(
            NaiveShift::fitted_values(&series),
            vec![None, Some(1.0), Some(2.0)]
        );
    }
}
