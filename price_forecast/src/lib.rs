//! # Price Forecast
//!
//! Forecasting for intraday through yearly commodity price series.
//!
//! ## Features
//!
//! - Loading and cleaning of CSV/Parquet price sources, with row accounting
//! - Windowing of loaded series (most recent rows, last N days, holdout split)
//! - Forecasting models (Naive Shift, ARIMA, additive trend/seasonality)
//! - Forecast results with optional confidence bounds, exportable as table, JSON, CSV or DataFrame
//! - Single-flight cache for loaded series and fitted models
//! - Accuracy metrics and holdout backtests
//!
//! ## Quick Start
//!
//! ```no_run
//! use price_forecast::models::{ArimaConfig, Strategy};
//! use price_forecast::pipeline::{ForecastPipeline, ForecastRequest};
//! use price_forecast::cache::ModelCache;
//! use std::sync::Arc;
//!
//! # fn main() -> price_forecast::error::Result<()> {
//! let pipeline = ForecastPipeline::with_cache(Arc::new(ModelCache::default()));
//!
//! let strategy = Strategy::Arima(ArimaConfig::new(2, 1, 2)?);
//! let request = ForecastRequest::new("prices.csv", strategy, 14);
//!
//! let forecast = pipeline.forecast(&request)?;
//! for row in forecast.to_table() {
//!     println!("{} {:.2} {:?} {:?}", row.timestamp, row.point, row.lower, row.upper);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod result;
pub mod utils;

// Re-export commonly used types
pub use crate::cache::{CacheConfig, ModelCache, ModelKey, SourceKey};
pub use crate::data::{Frequency, LoaderConfig, SeriesLoader, SeriesWindow, TimeSeries};
pub use crate::error::{ForecastError, Result};
pub use crate::models::{FittedForecastModel, FittedModel, ForecastModel, Strategy};
pub use crate::pipeline::{forecast, ForecastPipeline, ForecastRequest};
pub use crate::result::ForecastResult;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
