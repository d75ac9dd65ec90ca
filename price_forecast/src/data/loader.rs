//! Loading and cleaning of tabular price sources

use crate::data::{Frequency, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::utils::date_parser;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

const TIME_COLUMN_HINTS: &[&str] = &["timestamp", "date", "time", "data", "ds"];
const VALUE_COLUMN_HINTS: &[&str] = &["price", "close", "value", "preco", "y"];

/// Column selection for a tabular source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Name of the time column; detected from the header when absent
    #[serde(default)]
    pub time_column: Option<String>,
    /// Name of the price column; detected from the header when absent
    #[serde(default)]
    pub value_column: Option<String>,
    /// Step unit of the series; inferred from the timestamps when absent
    #[serde(default)]
    pub frequency: Option<Frequency>,
}

impl LoaderConfig {
    /// Use explicit column names
    pub fn with_columns(time_column: &str, value_column: &str) -> Self {
        Self {
            time_column: Some(time_column.to_string()),
            value_column: Some(value_column.to_string()),
            frequency: None,
        }
    }

    /// Fix the step unit of loaded series
    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }
}

/// Row accounting for one load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Rows present in the source
    pub rows_read: usize,
    /// Rows dropped because the timestamp could not be parsed
    pub invalid_timestamps: usize,
    /// Rows dropped because the value was missing, non-numeric or non-finite
    pub invalid_values: usize,
    /// Earlier rows replaced by a later row with the same timestamp
    pub duplicates_replaced: usize,
}

impl LoadReport {
    /// Rows dropped during cleaning (unparseable timestamps or values)
    pub fn dropped_rows(&self) -> usize {
        self.invalid_timestamps + self.invalid_values
    }
}

/// A cleaned series together with the accounting of how it was produced
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSeries {
    pub series: TimeSeries,
    pub report: LoadReport,
}

/// Data loader for price series
#[derive(Debug, Clone, Default)]
pub struct SeriesLoader {
    config: LoaderConfig,
}

impl SeriesLoader {
    /// Create a loader with the given column configuration
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Get the loader configuration
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load a source, choosing the reader from the file extension (Parquet or CSV)
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<LoadedSeries> {
        let path = path.as_ref();
        let is_parquet = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("parquet"))
            .unwrap_or(false);

        if is_parquet {
            self.from_parquet(path)
        } else {
            self.from_csv(path)
        }
    }

    /// Load time series data from a CSV file
    pub fn from_csv<P: AsRef<Path>>(&self, path: P) -> Result<LoadedSeries> {
        let path = path.as_ref();
        let file = open_source(path)?;

        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()
            .map_err(|e| {
                ForecastError::DataInvalid(format!("{}: unreadable CSV: {}", path.display(), e))
            })?;

        debug!(path = %path.display(), rows = df.height(), "read CSV source");
        self.from_dataframe(&df)
    }

    /// Load time series data from a Parquet file
    pub fn from_parquet<P: AsRef<Path>>(&self, path: P) -> Result<LoadedSeries> {
        let path = path.as_ref();
        let file = open_source(path)?;

        let df = ParquetReader::new(file).finish().map_err(|e| {
            ForecastError::DataInvalid(format!("{}: unreadable Parquet: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), rows = df.height(), "read Parquet source");
        self.from_dataframe(&df)
    }

    /// Clean an existing DataFrame into a series
    pub fn from_dataframe(&self, df: &DataFrame) -> Result<LoadedSeries> {
        let time_column = self.resolve_column(
            df,
            self.config.time_column.as_deref(),
            TIME_COLUMN_HINTS,
            "time",
        )?;
        let value_column = self.resolve_column(
            df,
            self.config.value_column.as_deref(),
            VALUE_COLUMN_HINTS,
            "value",
        )?;

        let raw_times = df.column(&time_column)?.cast(&DataType::Utf8)?;
        let raw_values = df.column(&value_column)?.cast(&DataType::Float64)?;

        let mut report = LoadReport {
            rows_read: df.height(),
            ..LoadReport::default()
        };
        let mut rows: Vec<(DateTime<Utc>, f64)> = Vec::with_capacity(df.height());

        let pairs = raw_times.utf8()?.into_iter().zip(raw_values.f64()?.into_iter());
        for (raw_time, raw_value) in pairs {
            let timestamp = match raw_time.map(date_parser::parse_timestamp) {
                Some(Ok(ts)) => ts,
                _ => {
                    report.invalid_timestamps += 1;
                    continue;
                }
            };

            match raw_value {
                Some(value) if value.is_finite() => rows.push((timestamp, value)),
                _ => report.invalid_values += 1,
            }
        }

        let rows = deduplicate_keep_last(rows, &mut report);
        if report.dropped_rows() > 0 {
            warn!(
                invalid_timestamps = report.invalid_timestamps,
                invalid_values = report.invalid_values,
                "dropped unusable rows while loading"
            );
        }

        if rows.is_empty() {
            return Err(ForecastError::DataInvalid(format!(
                "No usable rows remain in columns '{}'/'{}' after cleaning ({} rows read)",
                time_column, value_column, report.rows_read
            )));
        }

        let (timestamps, values): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        let mut series = TimeSeries::new(timestamps, values)?;
        if let Some(frequency) = self.config.frequency {
            series = series.with_frequency(frequency);
        }

        info!(
            rows = series.len(),
            dropped = report.dropped_rows(),
            duplicates = report.duplicates_replaced,
            "loaded price series"
        );

        Ok(LoadedSeries { series, report })
    }

    /// Pick the configured column, or the first whose name matches a hint
    fn resolve_column(
        &self,
        df: &DataFrame,
        configured: Option<&str>,
        hints: &[&str],
        role: &str,
    ) -> Result<String> {
        let names = df.get_column_names();

        if let Some(name) = configured {
            return names
                .iter()
                .find(|candidate| **candidate == name)
                .map(|candidate| candidate.to_string())
                .ok_or_else(|| {
                    ForecastError::DataInvalid(format!(
                        "Configured {} column '{}' not found",
                        role, name
                    ))
                });
        }

        // Exact matches take precedence over substring matches
        for hint in hints {
            if let Some(name) = names.iter().find(|n| n.to_lowercase() == *hint) {
                return Ok(name.to_string());
            }
        }
        for hint in hints.iter().filter(|hint| hint.len() > 2) {
            if let Some(name) = names.iter().find(|n| n.to_lowercase().contains(hint)) {
                return Ok(name.to_string());
            }
        }

        Err(ForecastError::DataInvalid(format!(
            "No {} column found among {:?}",
            role, names
        )))
    }
}

fn open_source(path: &Path) -> Result<File> {
    File::open(path)
        .map_err(|e| ForecastError::DataUnavailable(format!("{}: {}", path.display(), e)))
}

/// Sort by timestamp, keeping the last-seen row for identical timestamps
fn deduplicate_keep_last(
    mut rows: Vec<(DateTime<Utc>, f64)>,
    report: &mut LoadReport,
) -> Vec<(DateTime<Utc>, f64)> {
    // Stable sort: rows sharing a timestamp stay in source order
    rows.sort_by_key(|(ts, _)| *ts);

    let mut unique: Vec<(DateTime<Utc>, f64)> = Vec::with_capacity(rows.len());
    for row in rows {
        match unique.last_mut() {
            Some(last) if last.0 == row.0 => {
                *last = row;
                report.duplicates_replaced += 1;
            }
            _ => unique.push(row),
        }
    }

    unique
}
