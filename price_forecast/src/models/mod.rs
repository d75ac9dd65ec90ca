//! Forecasting models for price series
//!
//! Every strategy implements [`ForecastModel`] (configuration that can be
//! fit) and produces a [`FittedForecastModel`] (immutable, predicts any
//! horizon). [`Strategy`] and [`FittedModel`] are the tagged unions used to
//! pick a strategy at runtime and to persist fitted artifacts.

use crate::data::{Frequency, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::result::ForecastResult;
use crate::utils::future_timestamps;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::fs;
use std::path::Path;
use tracing::debug;

pub mod additive;
pub mod arima;
pub mod naive;

pub use additive::{
    AdditiveConfig, AdditiveModel, FittedAdditive, ForecastComponents, SeasonalityConfig,
};
pub use arima::{ArimaConfig, ArimaModel, FittedArima};
pub use naive::{FittedNaiveShift, NaiveShift};

/// Fitted forecast model
pub trait FittedForecastModel: Debug + Send + Sync {
    /// Generate a forecast for `horizon` steps after the last observation
    fn predict(&self, horizon: usize) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> &str;

    /// Where forecasts start from
    fn origin(&self) -> &ForecastOrigin;
}

/// Forecast model that can be fit on a price series
pub trait ForecastModel: Debug + Clone {
    /// The type of fitted model produced
    type Fitted: FittedForecastModel;

    /// Fit the model on a series; deterministic for identical input
    fn fit(&self, series: &TimeSeries) -> Result<Self::Fitted>;

    /// Get the name of the model
    fn name(&self) -> &str;

    /// Fewest observations `fit` accepts
    fn min_observations(&self) -> usize;

    /// Fail with `InsufficientData` when the series is too short
    fn check_observations(&self, series: &TimeSeries) -> Result<()> {
        let required = self.min_observations();
        if series.len() < required {
            return Err(ForecastError::InsufficientData {
                model: self.name().to_string(),
                required,
                actual: series.len(),
            });
        }
        Ok(())
    }
}

/// Last observed timestamp and step unit of the series a model was fit on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastOrigin {
    pub last_timestamp: DateTime<Utc>,
    pub frequency: Frequency,
}

impl ForecastOrigin {
    /// Origin of a non-empty series
    pub fn of(series: &TimeSeries) -> Result<Self> {
        let last_timestamp = series.last_timestamp().ok_or_else(|| {
            ForecastError::DataInvalid("Cannot forecast from an empty series".to_string())
        })?;

        Ok(Self {
            last_timestamp,
            frequency: series.frequency(),
        })
    }

    /// Timestamps of the next `horizon` steps; rejects a zero horizon
    pub fn future_timestamps(&self, horizon: usize) -> Result<Vec<DateTime<Utc>>> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Horizon must be at least 1".to_string(),
            ));
        }
        future_timestamps(self.last_timestamp, horizon, self.frequency)
    }
}

/// Runtime choice of forecasting strategy and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    NaiveShift,
    Arima(ArimaConfig),
    Additive(AdditiveConfig),
}

impl Strategy {
    /// Fit the selected strategy
    pub fn fit(&self, series: &TimeSeries) -> Result<FittedModel> {
        debug!(strategy = %self.describe(), observations = series.len(), "fitting model");

        Ok(match self {
            Strategy::NaiveShift => FittedModel::NaiveShift(NaiveShift::new().fit(series)?),
            Strategy::Arima(config) => {
                FittedModel::Arima(ArimaModel::new(config.clone())?.fit(series)?)
            }
            Strategy::Additive(config) => {
                FittedModel::Additive(AdditiveModel::new(config.clone())?.fit(series)?)
            }
        })
    }

    /// Human-readable strategy name with its parameters
    pub fn describe(&self) -> String {
        match self {
            Strategy::NaiveShift => NaiveShift::new().name().to_string(),
            Strategy::Arima(config) => format!("ARIMA({},{},{})", config.p, config.d, config.q),
            Strategy::Additive(_) => additive::MODEL_NAME.to_string(),
        }
    }

    /// Stable textual identity of the strategy and its parameters
    pub fn fingerprint(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Fitted model of any strategy; the serialized form is the model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum FittedModel {
    NaiveShift(FittedNaiveShift),
    Arima(FittedArima),
    Additive(FittedAdditive),
}

impl FittedModel {
    /// Decode an artifact produced by [`FittedModel::to_json`] or an external trainer
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ForecastError::ModelUnavailable(format!("Corrupt model artifact: {}", e)))
    }

    /// Encode as an artifact
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load an artifact from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            ForecastError::ModelUnavailable(format!("{}: {}", path.display(), e))
        })?;

        let model = Self::from_json(&json)?;
        debug!(path = %path.display(), model = model.name(), "loaded model artifact");
        Ok(model)
    }

    /// Save as an artifact on disk
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    fn inner(&self) -> &dyn FittedForecastModel {
        match self {
            FittedModel::NaiveShift(model) => model,
            FittedModel::Arima(model) => model,
            FittedModel::Additive(model) => model,
        }
    }
}

impl FittedForecastModel for FittedModel {
    fn predict(&self, horizon: usize) -> Result<ForecastResult> {
        self.inner().predict(horizon)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn origin(&self) -> &ForecastOrigin {
        self.inner().origin()
    }
}
