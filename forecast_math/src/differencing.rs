//! Differencing and integration of series
//!
//! `difference` removes `order` levels of integration; `integrate` undoes it
//! for a block of forecasts given the last observed value at every level.

use crate::{MathError, Result};

/// Apply `order` rounds of first differencing
pub fn difference(data: &[f64], order: usize) -> Result<Vec<f64>> {
    if data.len() <= order {
        return Err(MathError::InsufficientData(format!(
            "Differencing of order {} needs more than {} observations, got {}",
            order,
            order,
            data.len()
        )));
    }

    let mut result = data.to_vec();
    for _ in 0..order {
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }

    Ok(result)
}

/// Last value of the series at each differencing level `0..order`.
///
/// Element `k` is the final observation of the `k`-times differenced series.
pub fn integration_anchors(data: &[f64], order: usize) -> Result<Vec<f64>> {
    if data.len() <= order {
        return Err(MathError::InsufficientData(format!(
            "Integration anchors of order {} need more than {} observations, got {}",
            order,
            order,
            data.len()
        )));
    }

    let mut anchors = Vec::with_capacity(order);
    let mut level = data.to_vec();
    for _ in 0..order {
        // len > order guarantees a last element at every level
        anchors.push(level[level.len() - 1]);
        level = level.windows(2).map(|w| w[1] - w[0]).collect();
    }

    Ok(anchors)
}

/// Integrate forecasts made on the differenced scale back to the original scale.
pub fn integrate(forecasts: &[f64], anchors: &[f64]) -> Vec<f64> {
    let mut result = forecasts.to_vec();

    for &anchor in anchors.iter().rev() {
        let mut running = anchor;
        for value in result.iter_mut() {
            running += *value;
            *value = running;
        }
    }

    result
}
