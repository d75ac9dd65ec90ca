//! # Commodity Forecast
//!
//! Facade over the workspace crates:
//!
//! - [`price_forecast`]: loading, windowing, models, results, caching and the forecast pipeline
//! - [`forecast_math`]: numerical kernels the models are built on
//!
//! ## Example
//!
//! ```
//! use commodity_forecast::prelude::*;
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let timestamps = (0..4).map(|d| start + Duration::days(d)).collect();
//! let series = TimeSeries::new(timestamps, vec![100.0, 102.0, 101.0, 103.0]).unwrap();
//!
//! let forecast = forecast_series(&series, &Strategy::NaiveShift, 1).unwrap();
//! assert_eq!(forecast.values(), &[103.0]);
//! ```

pub use forecast_math;
pub use price_forecast;

/// Types needed for most forecasting tasks
pub mod prelude {
    pub use price_forecast::cache::{CacheConfig, ModelCache};
    pub use price_forecast::data::{
        Frequency, LoaderConfig, SeriesLoader, SeriesWindow, TimeSeries,
    };
    pub use price_forecast::error::{ForecastError, Result};
    pub use price_forecast::models::{
        AdditiveConfig, ArimaConfig, FittedForecastModel, FittedModel, ForecastModel, Strategy,
    };
    pub use price_forecast::pipeline::{
        forecast, forecast_series, ForecastPipeline, ForecastRequest, FitWindow,
    };
    pub use price_forecast::result::ForecastResult;
}

/// Version of the workspace facade
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
