//! # Forecast Math
//!
//! Numerical building blocks for univariate time series forecasting.
//! This crate provides the statistics, differencing, autoregressive estimation
//! and least-squares routines the forecasting models are built from.

use thiserror::Error;

pub mod autoregression;
pub mod differencing;
pub mod distribution;
pub mod regression;
pub mod stats;

/// Errors that can occur in forecasting calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for forecasting math operations
pub type Result<T> = std::result::Result<T, MathError>;
