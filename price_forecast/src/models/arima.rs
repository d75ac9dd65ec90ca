//! ARIMA models for time series forecasting
//!
//! The series is differenced `d` times; AR coefficients come from the
//! Yule-Walker equations on the differenced series and MA coefficients from
//! the autocorrelation of the AR residuals. Forecasts are produced
//! recursively and integrated back to the price scale. Bounds use the
//! residual variance propagated through the psi-weights of the integrated
//! model.

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{FittedForecastModel, ForecastModel, ForecastOrigin};
use crate::result::ForecastResult;
use forecast_math::autoregression::{integrated_ar, levinson_durbin, ma_from_residuals, psi_weights};
use forecast_math::differencing::{difference, integrate, integration_anchors};
use forecast_math::distribution::z_score;
use forecast_math::stats;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Confidence level of ARIMA bounds unless configured otherwise
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

const MAX_AR_ORDER: usize = 10;
const MAX_DIFFERENCING: usize = 2;
const MAX_MA_ORDER: usize = 10;

fn default_confidence_level() -> f64 {
    DEFAULT_CONFIDENCE_LEVEL
}

/// ARIMA orders and interval level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArimaConfig {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
    /// MA order (q)
    pub q: usize,
    /// Probability level of the forecast bounds
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
}

impl ArimaConfig {
    /// Create a new configuration with the default 95% bounds
    pub fn new(p: usize, d: usize, q: usize) -> Result<Self> {
        let config = Self {
            p,
            d,
            q,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
        };
        config.validate()?;
        Ok(config)
    }

    /// Use a different probability level for the bounds
    pub fn with_confidence_level(mut self, confidence_level: f64) -> Result<Self> {
        self.confidence_level = confidence_level;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.p > MAX_AR_ORDER {
            return Err(ForecastError::InvalidParameter(format!(
                "AR order must be <= {}, got {}",
                MAX_AR_ORDER, self.p
            )));
        }
        if self.d > MAX_DIFFERENCING {
            return Err(ForecastError::InvalidParameter(format!(
                "Differencing order must be <= {}, got {}",
                MAX_DIFFERENCING, self.d
            )));
        }
        if self.q > MAX_MA_ORDER {
            return Err(ForecastError::InvalidParameter(format!(
                "MA order must be <= {}, got {}",
                MAX_MA_ORDER, self.q
            )));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Confidence level must be between 0 and 1, got {}",
                self.confidence_level
            )));
        }
        Ok(())
    }
}

/// ARIMA model (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    config: ArimaConfig,
}

/// Fitted ARIMA model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedArima {
    /// Name of the model
    name: String,
    config: ArimaConfig,
    origin: ForecastOrigin,
    /// Mean of the differenced series
    mean: f64,
    /// Fitted AR coefficients
    ar_coefficients: Vec<f64>,
    /// Fitted MA coefficients
    ma_coefficients: Vec<f64>,
    /// Last value at each differencing level
    anchors: Vec<f64>,
    /// Last `p` values of the differenced series
    recent_differences: Vec<f64>,
    /// Last `q` one-step residuals
    recent_residuals: Vec<f64>,
    /// Variance of the one-step residuals
    residual_variance: f64,
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(config: ArimaConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            name: format!("ARIMA({},{},{})", config.p, config.d, config.q),
            config,
        })
    }

    /// Shorthand for an ARIMA(p, d, q) model with default bounds
    pub fn with_orders(p: usize, d: usize, q: usize) -> Result<Self> {
        Self::new(ArimaConfig::new(p, d, q)?)
    }
}

impl ForecastModel for ArimaModel {
    type Fitted = FittedArima;

    fn fit(&self, series: &TimeSeries) -> Result<FittedArima> {
        self.check_observations(series)?;
        let ArimaConfig { p, d, q, .. } = self.config;

        let values = series.values();
        let differenced = difference(values, d)?;
        let anchors = integration_anchors(values, d)?;

        // A constant differenced series is forecast as exactly that constant
        let mean = if stats::is_constant(&differenced) {
            differenced[0]
        } else {
            stats::mean(&differenced)?
        };

        let ar_coefficients = if p == 0 {
            Vec::new()
        } else {
            levinson_durbin(&stats::autocovariance(&differenced, p)?, p)?
        };

        let ar_residuals = one_step_residuals(&differenced, mean, &ar_coefficients, &[]);
        let ma_coefficients = ma_from_residuals(&ar_residuals[p..], q)?;
        let residuals = one_step_residuals(&differenced, mean, &ar_coefficients, &ma_coefficients);

        let settled = &residuals[p..];
        let residual_variance = if settled.is_empty() {
            0.0
        } else {
            settled.iter().map(|r| r * r).sum::<f64>() / settled.len() as f64
        };

        let finite = mean.is_finite()
            && residual_variance.is_finite()
            && ar_coefficients.iter().chain(&ma_coefficients).all(|c| c.is_finite());
        if !finite {
            return Err(ForecastError::FitFailure(format!(
                "{} estimation produced non-finite parameters",
                self.name
            )));
        }

        debug!(
            model = %self.name,
            ar = ?ar_coefficients,
            ma = ?ma_coefficients,
            residual_variance,
            "fitted ARIMA"
        );

        let n = differenced.len();
        Ok(FittedArima {
            name: self.name.clone(),
            config: self.config.clone(),
            origin: ForecastOrigin::of(series)?,
            mean,
            recent_differences: differenced[n - p..].to_vec(),
            recent_residuals: residuals[n - q..].to_vec(),
            ar_coefficients,
            ma_coefficients,
            anchors,
            residual_variance,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn min_observations(&self) -> usize {
        self.config.p + self.config.d + self.config.q + 1
    }
}

impl FittedArima {
    /// Get the fitted AR coefficients
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    /// Get the fitted MA coefficients
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// Variance of the one-step residuals
    pub fn residual_variance(&self) -> f64 {
        self.residual_variance
    }

    /// Get the model configuration
    pub fn config(&self) -> &ArimaConfig {
        &self.config
    }

    /// Point forecasts on the differenced scale
    fn forecast_differences(&self, horizon: usize) -> Vec<f64> {
        let mut history = self.recent_differences.clone();
        let mut shocks = self.recent_residuals.clone();
        let mut forecasts = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let ar_part: f64 = self
                .ar_coefficients
                .iter()
                .enumerate()
                .map(|(j, c)| c * (history[history.len() - 1 - j] - self.mean))
                .sum();
            let ma_part: f64 = self
                .ma_coefficients
                .iter()
                .enumerate()
                .map(|(j, c)| c * shocks[shocks.len() - 1 - j])
                .sum();

            let forecast = self.mean + ar_part + ma_part;
            history.push(forecast);
            // Future shocks have zero expectation
            shocks.push(0.0);
            forecasts.push(forecast);
        }

        forecasts
    }
}

impl FittedForecastModel for FittedArima {
    fn predict(&self, horizon: usize) -> Result<ForecastResult> {
        let timestamps = self.origin.future_timestamps(horizon)?;
        let values = integrate(&self.forecast_differences(horizon), &self.anchors);

        let psi = psi_weights(
            &integrated_ar(&self.ar_coefficients, self.config.d),
            &self.ma_coefficients,
            horizon,
        );
        let z = z_score(self.config.confidence_level)?;

        let mut cumulative = 0.0;
        let intervals = values
            .iter()
            .zip(&psi)
            .map(|(value, weight)| {
                cumulative += weight * weight;
                let half_width = z * (self.residual_variance * cumulative).sqrt();
                (value - half_width, value + half_width)
            })
            .collect();

        ForecastResult::new_with_intervals(
            &self.name,
            timestamps,
            values,
            intervals,
            self.config.confidence_level,
        )
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn origin(&self) -> &ForecastOrigin {
        &self.origin
    }
}

/// One-step-ahead residuals of an ARMA model with the given mean
fn one_step_residuals(series: &[f64], mean: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut residuals: Vec<f64> = Vec::with_capacity(series.len());

    for t in 0..series.len() {
        let ar_part: f64 = ar
            .iter()
            .enumerate()
            .take(t)
            .map(|(j, c)| c * (series[t - j - 1] - mean))
            .sum();
        let ma_part: f64 = ma
            .iter()
            .enumerate()
            .take(t)
            .map(|(j, c)| c * residuals[t - j - 1])
            .sum();

        residuals.push(series[t] - (mean + ar_part + ma_part));
    }

    residuals
}
