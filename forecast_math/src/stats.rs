//! Descriptive statistics over slices of observations

use crate::{MathError, Result};

/// Relative tolerance used to decide that a series carries no variation
pub const CONSTANT_TOLERANCE: f64 = 1e-12;

/// Arithmetic mean of the data
pub fn mean(data: &[f64]) -> Result<f64> {
    if data.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute the mean of an empty slice".to_string(),
        ));
    }

    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population variance of the data
pub fn variance(data: &[f64]) -> Result<f64> {
    let mean = mean(data)?;
    let sum_sq: f64 = data.iter().map(|x| (x - mean).powi(2)).sum();
    Ok(sum_sq / data.len() as f64)
}

/// Population standard deviation of the data
pub fn std_dev(data: &[f64]) -> Result<f64> {
    Ok(variance(data)?.sqrt())
}

/// Returns true when every value equals the first one (within a relative tolerance).
///
/// An empty slice is considered constant.
pub fn is_constant(data: &[f64]) -> bool {
    match data.first() {
        Some(&first) => {
            let tolerance = CONSTANT_TOLERANCE * first.abs().max(1.0);
            data.iter().all(|x| (x - first).abs() <= tolerance)
        }
        None => true,
    }
}

/// Sample autocovariances for lags `0..=max_lag`.
///
/// Every lag is normalised by `n` (not `n - k`) so the sequence stays
/// positive semi-definite for the Levinson-Durbin recursion.
pub fn autocovariance(data: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    let n = data.len();
    if n <= max_lag {
        return Err(MathError::InsufficientData(format!(
            "Autocovariance up to lag {} needs more than {} observations, got {}",
            max_lag, max_lag, n
        )));
    }

    let mean = mean(data)?;
    let centered: Vec<f64> = data.iter().map(|x| x - mean).collect();

    let autocov = (0..=max_lag)
        .map(|k| {
            centered[k..]
                .iter()
                .zip(centered.iter())
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / n as f64
        })
        .collect();

    Ok(autocov)
}
