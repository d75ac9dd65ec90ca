//! End-to-end forecasting: load, window, fit, predict

use crate::cache::{ModelCache, ModelKey, SourceKey};
use crate::data::{LoadedSeries, SeriesLoader, SeriesWindow, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::{FittedForecastModel, FittedModel, Strategy};
use crate::result::ForecastResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const ARTIFACT_FINGERPRINT: &str = "artifact";

/// Restriction of the loaded series before fitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FitWindow {
    /// The most recent observations
    Tail { observations: usize },
    /// Observations within this many days of the last one
    LastDays { days: i64 },
}

impl FitWindow {
    /// Apply the window to a series
    pub fn apply(&self, series: &TimeSeries) -> TimeSeries {
        match self {
            FitWindow::Tail { observations } => SeriesWindow::tail(series, *observations),
            FitWindow::LastDays { days } => SeriesWindow::last_days(series, *days),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            FitWindow::Tail { observations: 0 } => Err(ForecastError::InvalidParameter(
                "Tail window must keep at least one observation".to_string(),
            )),
            FitWindow::LastDays { days } if *days < 0 => Err(ForecastError::InvalidParameter(
                format!("Window length must not be negative, got {} days", days),
            )),
            _ => Ok(()),
        }
    }
}

/// What to forecast and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    /// CSV or Parquet price source
    pub source: PathBuf,
    pub strategy: Strategy,
    /// Number of steps after the last observation
    pub horizon: usize,
    #[serde(default)]
    pub window: Option<FitWindow>,
}

impl ForecastRequest {
    /// Create a new request over the whole source
    pub fn new<P: AsRef<Path>>(source: P, strategy: Strategy, horizon: usize) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            strategy,
            horizon,
            window: None,
        }
    }

    /// Fit only on a window of the source
    pub fn with_window(mut self, window: FitWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Decode a request from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let request: Self = serde_json::from_str(json)?;
        request.validate()?;
        Ok(request)
    }

    /// Read a JSON request file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Check the horizon and window
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Horizon must be at least 1".to_string(),
            ));
        }
        if let Some(window) = &self.window {
            window.validate()?;
        }
        Ok(())
    }

    /// Identity of the model this request fits, given its source
    fn model_fingerprint(&self) -> Result<String> {
        Ok(serde_json::to_string(&(&self.strategy, &self.window))?)
    }
}

/// Cache-backed forecasting over file sources
///
/// Pipelines that share a cache should share a loader configuration, since
/// loaded series are keyed by source file only.
#[derive(Debug, Clone)]
pub struct ForecastPipeline {
    cache: Arc<ModelCache>,
    loader: SeriesLoader,
}

impl ForecastPipeline {
    /// Create a new pipeline
    pub fn new(cache: Arc<ModelCache>, loader: SeriesLoader) -> Self {
        Self { cache, loader }
    }

    /// Pipeline with the default loader
    pub fn with_cache(cache: Arc<ModelCache>) -> Self {
        Self::new(cache, SeriesLoader::default())
    }

    /// The cache this pipeline reads and fills
    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    /// Load a source through the cache
    pub fn load<P: AsRef<Path>>(&self, source: P) -> Result<Arc<LoadedSeries>> {
        Ok(self.load_keyed(source.as_ref())?.1)
    }

    /// Load `source` under its current identity, dropping entries for its older states.
    ///
    /// A file that changes while it is read is reported as unavailable rather
    /// than cached under the identity it had before the read.
    fn load_keyed(&self, source: &Path) -> Result<(SourceKey, Arc<LoadedSeries>)> {
        let key = SourceKey::from_path(source)?;
        self.cache.replace_source(&key);

        let loaded = self.cache.get_or_load(&key, || {
            let loaded = self.loader.load(source)?;
            ensure_unchanged(source, &key)?;
            Ok(loaded)
        })?;
        Ok((key, loaded))
    }

    /// Run a request, reusing a cached series and model when the source is unchanged
    pub fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResult> {
        request.validate()?;

        let (source_key, loaded) = self.load_keyed(&request.source)?;

        let model_key = ModelKey::new(source_key, request.model_fingerprint()?);
        let model = self.cache.get_or_fit(&model_key, || {
            let series = match &request.window {
                Some(window) => window.apply(&loaded.series),
                None => loaded.series.clone(),
            };
            request.strategy.fit(&series)
        })?;

        let result = model.predict(request.horizon)?;
        info!(
            source = %request.source.display(),
            model = model.name(),
            horizon = request.horizon,
            "forecast complete"
        );
        Ok(result)
    }

    /// Forecast from a saved model artifact, caching the decoded model
    pub fn forecast_from_artifact<P: AsRef<Path>>(
        &self,
        artifact: P,
        horizon: usize,
    ) -> Result<ForecastResult> {
        let artifact = artifact.as_ref();
        let source_key = SourceKey::from_path(artifact).map_err(|e| {
            ForecastError::ModelUnavailable(format!("Model artifact not found: {}", e))
        })?;

        self.cache.replace_source(&source_key);

        let key = ModelKey::new(source_key, ARTIFACT_FINGERPRINT);
        let model = self.cache.get_or_fit(&key, || {
            let model = FittedModel::load(artifact)?;
            ensure_unchanged(artifact, &key.source)?;
            Ok(model)
        })?;
        model.predict(horizon)
    }
}

/// Fails when `path` no longer matches the identity it had before it was read
fn ensure_unchanged(path: &Path, before: &SourceKey) -> Result<()> {
    if &SourceKey::from_path(path)? != before {
        return Err(ForecastError::DataUnavailable(format!(
            "{} changed while it was being read",
            path.display()
        )));
    }
    Ok(())
}

/// Fit `strategy` on `series` and forecast `horizon` steps, without caching
pub fn forecast_series(
    series: &TimeSeries,
    strategy: &Strategy,
    horizon: usize,
) -> Result<ForecastResult> {
    if horizon == 0 {
        return Err(ForecastError::InvalidParameter(
            "Horizon must be at least 1".to_string(),
        ));
    }
    strategy.fit(series)?.predict(horizon)
}

/// Load `source` with the default loader and forecast it, without caching
pub fn forecast<P: AsRef<Path>>(
    source: P,
    strategy: &Strategy,
    horizon: usize,
) -> Result<ForecastResult> {
    let loaded = SeriesLoader::default().load(source)?;
    forecast_series(&loaded.series, strategy, horizon)
}
