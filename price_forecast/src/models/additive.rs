//! Additive trend/seasonality model
//!
//! `y(t) = trend(t) + sum of seasonal(t)`, where the trend is linear in time
//! and each seasonality is a truncated Fourier series of a fixed period. All
//! terms are fit jointly by ridge-regularised least squares on a rescaled
//! target; only the seasonal coefficients are penalised.

use crate::data::{Frequency, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::{FittedForecastModel, ForecastModel, ForecastOrigin};
use crate::result::ForecastResult;
use chrono::{DateTime, Utc};
use forecast_math::distribution::z_score;
use forecast_math::regression::{ridge_fit, RidgeFit};
use forecast_math::stats;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Name reported by additive forecasts
pub const MODEL_NAME: &str = "Additive Trend/Seasonality";

/// Probability level of the bounds unless configured otherwise
pub const DEFAULT_INTERVAL_WIDTH: f64 = 0.80;

/// Prior scale of the seasonal coefficients unless configured otherwise
pub const DEFAULT_SEASONALITY_PRIOR_SCALE: f64 = 10.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

fn default_interval_width() -> f64 {
    DEFAULT_INTERVAL_WIDTH
}

fn default_seasonality_prior_scale() -> f64 {
    DEFAULT_SEASONALITY_PRIOR_SCALE
}

/// A periodic component expressed as a Fourier series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalityConfig {
    pub name: String,
    /// Period length in days
    pub period_days: f64,
    /// Number of sine/cosine pairs
    pub fourier_order: usize,
}

impl SeasonalityConfig {
    /// Create a custom seasonality
    pub fn new(name: &str, period_days: f64, fourier_order: usize) -> Result<Self> {
        let config = Self {
            name: name.to_string(),
            period_days,
            fourier_order,
        };
        config.validate()?;
        Ok(config)
    }

    /// Seven-day cycle
    pub fn weekly() -> Self {
        Self {
            name: "weekly".to_string(),
            period_days: 7.0,
            fourier_order: 3,
        }
    }

    /// Calendar-year cycle
    pub fn yearly() -> Self {
        Self {
            name: "yearly".to_string(),
            period_days: 365.25,
            fourier_order: 10,
        }
    }

    /// Intraday cycle
    pub fn daily() -> Self {
        Self {
            name: "daily".to_string(),
            period_days: 1.0,
            fourier_order: 4,
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.period_days.is_finite() && self.period_days > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Seasonality '{}' needs a positive period, got {}",
                self.name, self.period_days
            )));
        }
        if self.fourier_order == 0 {
            return Err(ForecastError::InvalidParameter(format!(
                "Seasonality '{}' needs a Fourier order of at least 1",
                self.name
            )));
        }
        Ok(())
    }

    /// Sine/cosine features at `t_days`
    fn features(&self, t_days: f64) -> impl Iterator<Item = f64> + '_ {
        (1..=self.fourier_order).flat_map(move |k| {
            let angle = 2.0 * PI * k as f64 * t_days / self.period_days;
            [angle.sin(), angle.cos()]
        })
    }
}

/// Additive model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditiveConfig {
    /// Explicit seasonalities; `None` picks them from the span and frequency of the data
    #[serde(default)]
    pub seasonalities: Option<Vec<SeasonalityConfig>>,
    /// Probability level of the predictive bounds
    #[serde(default = "default_interval_width")]
    pub interval_width: f64,
    /// Prior scale of the seasonal coefficients; smaller values shrink them harder
    #[serde(default = "default_seasonality_prior_scale")]
    pub seasonality_prior_scale: f64,
}

impl Default for AdditiveConfig {
    fn default() -> Self {
        Self {
            seasonalities: None,
            interval_width: DEFAULT_INTERVAL_WIDTH,
            seasonality_prior_scale: DEFAULT_SEASONALITY_PRIOR_SCALE,
        }
    }
}

impl AdditiveConfig {
    /// Use exactly these seasonalities
    pub fn with_seasonalities(mut self, seasonalities: Vec<SeasonalityConfig>) -> Self {
        self.seasonalities = Some(seasonalities);
        self
    }

    /// Use a different probability level for the bounds
    pub fn with_interval_width(mut self, interval_width: f64) -> Result<Self> {
        self.interval_width = interval_width;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Interval width must be between 0 and 1, got {}",
                self.interval_width
            )));
        }
        if !(self.seasonality_prior_scale.is_finite() && self.seasonality_prior_scale > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Seasonality prior scale must be positive, got {}",
                self.seasonality_prior_scale
            )));
        }
        if let Some(seasonalities) = &self.seasonalities {
            for seasonality in seasonalities {
                seasonality.validate()?;
            }
        }
        Ok(())
    }
}

/// Seasonalities the data can support: weekly from two weeks of sub-weekly
/// data, yearly from two years of sub-yearly data, daily from two days of
/// intraday data
fn automatic_seasonalities(span_days: f64, frequency: Frequency) -> Vec<SeasonalityConfig> {
    let mut seasonalities = Vec::new();
    let sub_weekly = matches!(
        frequency,
        Frequency::Minute | Frequency::Hourly | Frequency::Daily
    );

    if span_days >= 14.0 && sub_weekly {
        seasonalities.push(SeasonalityConfig::weekly());
    }
    if span_days >= 730.0 && frequency != Frequency::Yearly {
        seasonalities.push(SeasonalityConfig::yearly());
    }
    if matches!(frequency, Frequency::Hourly | Frequency::Minute) && span_days >= 2.0 {
        seasonalities.push(SeasonalityConfig::daily());
    }

    seasonalities
}

/// Additive trend/seasonality model
#[derive(Debug, Clone)]
pub struct AdditiveModel {
    config: AdditiveConfig,
}

impl AdditiveModel {
    /// Create a new additive model
    pub fn new(config: AdditiveConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum AdditiveFit {
    /// The training values were all equal
    Constant(f64),
    Regression(RidgeFit),
}

/// Fitted additive model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedAdditive {
    origin: ForecastOrigin,
    /// Seasonalities in effect, after automatic selection
    seasonalities: Vec<SeasonalityConfig>,
    interval_width: f64,
    /// Time zero of the design
    start: DateTime<Utc>,
    /// Training span in days; the trend column is `t / time_scale`
    time_scale: f64,
    /// Target is fit as `y / value_scale`
    value_scale: f64,
    fit: AdditiveFit,
}

/// Forecast split into its additive parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastComponents {
    pub timestamps: Vec<DateTime<Utc>>,
    pub trend: Vec<f64>,
    /// One series per seasonality, in configuration order
    pub seasonal: Vec<(String, Vec<f64>)>,
}

impl ForecastModel for AdditiveModel {
    type Fitted = FittedAdditive;

    fn fit(&self, series: &TimeSeries) -> Result<FittedAdditive> {
        self.check_observations(series)?;

        let timestamps = series.timestamps();
        let values = series.values();
        let start = timestamps[0];
        let time_scale = days_between(start, timestamps[timestamps.len() - 1]);
        if time_scale <= 0.0 {
            return Err(ForecastError::DataInvalid(
                "Series spans less than a millisecond".to_string(),
            ));
        }

        let seasonalities = match &self.config.seasonalities {
            Some(explicit) => explicit.clone(),
            None => automatic_seasonalities(time_scale, series.frequency()),
        };

        let max_abs = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let value_scale = if max_abs > 0.0 { max_abs } else { 1.0 };

        let mut fitted = FittedAdditive {
            origin: ForecastOrigin::of(series)?,
            seasonalities,
            interval_width: self.config.interval_width,
            start,
            time_scale,
            value_scale,
            fit: AdditiveFit::Constant(values[0]),
        };

        if stats::is_constant(values) {
            debug!(value = values[0], "constant series, additive fit skipped");
            return Ok(fitted);
        }

        let design: Vec<Vec<f64>> = timestamps.iter().map(|t| fitted.design_row(*t)).collect();
        let target: Vec<f64> = values.iter().map(|v| v / value_scale).collect();

        let seasonal_penalty = 1.0 / self.config.seasonality_prior_scale.powi(2);
        let mut penalties = vec![seasonal_penalty; design[0].len()];
        penalties[0] = 0.0;
        penalties[1] = 0.0;

        let regression = ridge_fit(&design, &target, &penalties)?;
        if regression.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ForecastError::FitFailure(
                "Additive regression produced non-finite coefficients".to_string(),
            ));
        }

        let names: Vec<&str> = fitted.seasonalities.iter().map(|s| s.name.as_str()).collect();
        debug!(
            seasonalities = ?names,
            residual_variance = regression.residual_variance,
            "fitted additive model"
        );

        fitted.fit = AdditiveFit::Regression(regression);
        Ok(fitted)
    }

    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn min_observations(&self) -> usize {
        2
    }
}

impl FittedAdditive {
    /// Seasonalities the model was fit with
    pub fn seasonalities(&self) -> &[SeasonalityConfig] {
        &self.seasonalities
    }

    /// Forecast decomposed into trend and per-seasonality contributions
    pub fn predict_components(&self, horizon: usize) -> Result<ForecastComponents> {
        let timestamps = self.origin.future_timestamps(horizon)?;

        let regression = match &self.fit {
            AdditiveFit::Constant(level) => {
                return Ok(ForecastComponents {
                    trend: vec![*level; horizon],
                    seasonal: self
                        .seasonalities
                        .iter()
                        .map(|s| (s.name.clone(), vec![0.0; horizon]))
                        .collect(),
                    timestamps,
                })
            }
            AdditiveFit::Regression(regression) => regression,
        };

        let coefficients = &regression.coefficients;
        let rows: Vec<Vec<f64>> = timestamps.iter().map(|t| self.design_row(*t)).collect();

        let trend = rows
            .iter()
            .map(|row| (coefficients[0] + coefficients[1] * row[1]) * self.value_scale)
            .collect();

        let mut offset = 2;
        let mut seasonal = Vec::with_capacity(self.seasonalities.len());
        for seasonality in &self.seasonalities {
            let width = 2 * seasonality.fourier_order;
            let columns = offset..offset + width;
            let contribution = rows
                .iter()
                .map(|row| {
                    columns
                        .clone()
                        .map(|j| coefficients[j] * row[j])
                        .sum::<f64>()
                        * self.value_scale
                })
                .collect();
            seasonal.push((seasonality.name.clone(), contribution));
            offset += width;
        }

        Ok(ForecastComponents {
            timestamps,
            trend,
            seasonal,
        })
    }

    /// `[1, t / time_scale, seasonal features...]`
    fn design_row(&self, timestamp: DateTime<Utc>) -> Vec<f64> {
        let t = days_between(self.start, timestamp);
        let mut row = vec![1.0, t / self.time_scale];
        for seasonality in &self.seasonalities {
            row.extend(seasonality.features(t));
        }
        row
    }
}

impl FittedForecastModel for FittedAdditive {
    fn predict(&self, horizon: usize) -> Result<ForecastResult> {
        let timestamps = self.origin.future_timestamps(horizon)?;

        let (values, intervals): (Vec<f64>, Vec<(f64, f64)>) = match &self.fit {
            AdditiveFit::Constant(level) => {
                (vec![*level; horizon], vec![(*level, *level); horizon])
            }
            AdditiveFit::Regression(regression) => {
                let z = z_score(self.interval_width)?;
                timestamps
                    .iter()
                    .map(|t| {
                        let row = self.design_row(*t);
                        let point = regression.predict(&row) * self.value_scale;
                        let half_width =
                            z * regression.predictive_variance(&row).sqrt() * self.value_scale;
                        (point, (point - half_width, point + half_width))
                    })
                    .unzip()
            }
        };

        ForecastResult::new_with_intervals(
            MODEL_NAME,
            timestamps,
            values,
            intervals,
            self.interval_width,
        )
    }

    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn origin(&self) -> &ForecastOrigin {
        &self.origin
    }
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / MILLIS_PER_DAY
}
