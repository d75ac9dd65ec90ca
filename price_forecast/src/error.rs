//! Error types for the price_forecast crate

use forecast_math::MathError;
use polars::prelude::PolarsError;
use std::sync::Arc;
use thiserror::Error;

/// Custom error types for the price_forecast crate
///
/// Errors are `Clone` so a single failed load or fit can be handed to every
/// caller waiting on it in the model cache.
#[derive(Debug, Clone, Error)]
pub enum ForecastError {
    /// The data source could not be located, opened or read
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// The data source was read but holds no usable rows
    #[error("Data invalid: {0}")]
    DataInvalid(String),

    /// Fewer observations than the model requires
    #[error("Insufficient data for {model}: need at least {required} observations, got {actual}")]
    InsufficientData {
        model: String,
        required: usize,
        actual: usize,
    },

    /// Numerical failure while fitting a model
    #[error("Fit failure: {0}")]
    FitFailure(String),

    /// A model artifact is missing or corrupt
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error related to shape or ordering validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(Arc<std::io::Error>),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error while encoding or decoding JSON or CSV output
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<std::io::Error> for ForecastError {
    fn from(err: std::io::Error) -> Self {
        ForecastError::IoError(Arc::new(err))
    }
}

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::SerializationError(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::SerializationError(err.to_string())
    }
}

impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::InvalidInput(msg) => ForecastError::InvalidParameter(msg),
            other => ForecastError::FitFailure(other.to_string()),
        }
    }
}
