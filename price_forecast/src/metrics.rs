//! Metrics for evaluating forecast performance

use crate::data::{SeriesWindow, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::{FittedForecastModel, Strategy};
use crate::result::ForecastResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Forecast accuracy metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error, over non-zero actuals
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
    /// Share of steps where forecast and actual moved the same way, in percent
    pub direction_accuracy: f64,
}

impl fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Forecast Accuracy:")?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAPE:  {:.2}%", self.mape)?;
        writeln!(f, "  sMAPE: {:.2}%", self.smape)?;
        write!(f, "  Direction: {:.2}%", self.direction_accuracy)
    }
}

/// Compare forecast values against actual values position by position
pub fn forecast_accuracy(forecast: &[f64], actual: &[f64]) -> Result<ForecastAccuracy> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::ValidationError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = forecast.len() as f64;
    let errors: Vec<f64> = forecast.iter().zip(actual).map(|(f, a)| a - f).collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;

    let percentage_errors: Vec<f64> = actual
        .iter()
        .zip(&errors)
        .filter(|(a, _)| **a != 0.0)
        .map(|(a, e)| e.abs() / a.abs() * 100.0)
        .collect();
    let mape = if percentage_errors.is_empty() {
        0.0
    } else {
        percentage_errors.iter().sum::<f64>() / percentage_errors.len() as f64
    };

    let smape = actual
        .iter()
        .zip(forecast)
        .map(|(a, f)| {
            let denominator = a.abs() + f.abs();
            if denominator == 0.0 {
                0.0
            } else {
                200.0 * (a - f).abs() / denominator
            }
        })
        .sum::<f64>()
        / n;

    Ok(ForecastAccuracy {
        mae,
        mse,
        rmse: mse.sqrt(),
        mape,
        smape,
        direction_accuracy: direction_accuracy(forecast, actual),
    })
}

fn direction_accuracy(forecast: &[f64], actual: &[f64]) -> f64 {
    let moves: Vec<bool> = forecast
        .windows(2)
        .zip(actual.windows(2))
        .filter(|(f, a)| (f[1] - f[0]).abs() > 1e-10 && (a[1] - a[0]).abs() > 1e-10)
        .map(|(f, a)| (f[1] > f[0]) == (a[1] > a[0]))
        .collect();

    if moves.is_empty() {
        0.0
    } else {
        moves.iter().filter(|correct| **correct).count() as f64 / moves.len() as f64 * 100.0
    }
}

/// Holdout evaluation of a strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backtest {
    /// Forecast over the holdout period
    pub forecast: ForecastResult,
    /// Observations that were held out
    pub actual: TimeSeries,
    pub accuracy: ForecastAccuracy,
}

/// Fit `strategy` on all but the last `holdout` observations and score the
/// forecast of those observations
pub fn backtest(strategy: &Strategy, series: &TimeSeries, holdout: usize) -> Result<Backtest> {
    let (train, actual) = SeriesWindow::split_holdout(series, holdout)?;

    let model = strategy.fit(&train)?;
    let forecast = model.predict(holdout)?;
    let accuracy = forecast_accuracy(forecast.values(), actual.values())?;

    info!(
        strategy = %strategy.describe(),
        holdout,
        mae = accuracy.mae,
        rmse = accuracy.rmse,
        "backtest complete"
    );

    Ok(Backtest {
        forecast,
        actual,
        accuracy,
    })
}
