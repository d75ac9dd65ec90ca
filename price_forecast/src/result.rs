//! Forecast output contract

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// One forecast step, as displayed by a table or exported to CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub timestamp: DateTime<Utc>,
    pub point: f64,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Forecast result containing predicted values, their timestamps and optional bounds
///
/// Decoding goes through the same shape checks as construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawForecastResult")]
pub struct ForecastResult {
    /// Name of the model that produced the forecast
    model: String,
    /// Timestamps, strictly increasing
    timestamps: Vec<DateTime<Utc>>,
    /// Forecasted values
    values: Vec<f64>,
    /// Lower/upper bounds, when the model estimates uncertainty
    intervals: Option<Vec<(f64, f64)>>,
    /// Probability level of the bounds
    confidence_level: Option<f64>,
}

/// Wire form of a forecast result, checked before it becomes a [`ForecastResult`]
#[derive(Deserialize)]
struct RawForecastResult {
    model: String,
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
    intervals: Option<Vec<(f64, f64)>>,
    confidence_level: Option<f64>,
}

impl TryFrom<RawForecastResult> for ForecastResult {
    type Error = ForecastError;

    fn try_from(raw: RawForecastResult) -> Result<Self> {
        match (raw.intervals, raw.confidence_level) {
            (Some(intervals), Some(level)) => {
                Self::new_with_intervals(&raw.model, raw.timestamps, raw.values, intervals, level)
            }
            (None, None) => Self::new(&raw.model, raw.timestamps, raw.values),
            _ => Err(ForecastError::ValidationError(
                "Intervals and confidence level must be given together".to_string(),
            )),
        }
    }
}

impl ForecastResult {
    /// Create a new forecast result without bounds
    pub fn new(model: &str, timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        validate_shape(&timestamps, &values)?;

        Ok(Self {
            model: model.to_string(),
            timestamps,
            values,
            intervals: None,
            confidence_level: None,
        })
    }

    /// Create a new forecast result with confidence intervals
    pub fn new_with_intervals(
        model: &str,
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<f64>,
        intervals: Vec<(f64, f64)>,
        confidence_level: f64,
    ) -> Result<Self> {
        validate_shape(&timestamps, &values)?;

        if values.len() != intervals.len() {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match intervals length ({})",
                values.len(),
                intervals.len()
            )));
        }

        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(ForecastError::ValidationError(format!(
                "Confidence level must be between 0 and 1, got {}",
                confidence_level
            )));
        }

        Ok(Self {
            model: model.to_string(),
            timestamps,
            values,
            intervals: Some(intervals),
            confidence_level: Some(confidence_level),
        })
    }

    /// Name of the model that produced the forecast
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the timestamps
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Get the confidence intervals, if available
    pub fn intervals(&self) -> Option<&[(f64, f64)]> {
        self.intervals.as_deref()
    }

    /// Probability level of the intervals, if available
    pub fn confidence_level(&self) -> Option<f64> {
        self.confidence_level
    }

    /// Get the number of periods forecasted
    pub fn horizon(&self) -> usize {
        self.values.len()
    }

    /// Check if the forecast holds no steps
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Ordered rows for display
    pub fn to_table(&self) -> Vec<ForecastRow> {
        self.timestamps
            .iter()
            .zip(&self.values)
            .enumerate()
            .map(|(i, (timestamp, point))| {
                let bounds = self.intervals.as_ref().map(|intervals| intervals[i]);
                ForecastRow {
                    timestamp: *timestamp,
                    point: *point,
                    lower: bounds.map(|(lower, _)| lower),
                    upper: bounds.map(|(_, upper)| upper),
                }
            })
            .collect()
    }

    /// The first `n` steps of the forecast
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.horizon());

        Self {
            model: self.model.clone(),
            timestamps: self.timestamps[..n].to_vec(),
            values: self.values[..n].to_vec(),
            intervals: self.intervals.as_ref().map(|i| i[..n].to_vec()),
            confidence_level: self.confidence_level,
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the table as CSV with `timestamp,point,lower,upper` columns
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in self.to_table() {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Export as a DataFrame; bound columns are null when the model has no bounds
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let rows = self.to_table();
        let millis: Vec<i64> = rows.iter().map(|r| r.timestamp.timestamp_millis()).collect();
        let lower: Vec<Option<f64>> = rows.iter().map(|r| r.lower).collect();
        let upper: Vec<Option<f64>> = rows.iter().map(|r| r.upper).collect();

        let timestamp = Series::new("timestamp", millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

        Ok(DataFrame::new(vec![
            timestamp,
            Series::new("forecast", self.values.clone()),
            Series::new("lower", lower),
            Series::new("upper", upper),
        ])?)
    }

    /// Calculate mean absolute error between forecast and actual values
    pub fn mean_absolute_error(&self, actual: &[f64]) -> Result<f64> {
        Ok(crate::metrics::forecast_accuracy(&self.values, actual)?.mae)
    }
}

fn validate_shape(timestamps: &[DateTime<Utc>], values: &[f64]) -> Result<()> {
    if timestamps.len() != values.len() {
        return Err(ForecastError::ValidationError(format!(
            "Values length ({}) doesn't match timestamps length ({})",
            values.len(),
            timestamps.len()
        )));
    }

    if timestamps.windows(2).any(|w| w[1] <= w[0]) {
        return Err(ForecastError::ValidationError(
            "Forecast timestamps must be strictly increasing".to_string(),
        ));
    }

    Ok(())
}
