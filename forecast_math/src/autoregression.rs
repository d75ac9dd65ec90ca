//! Autoregressive estimation and moving-average representations
//!
//! Contains:
//! - Yule-Walker estimation through the Levinson-Durbin recursion
//! - Moving-average coefficients from residual autocorrelation
//! - Psi-weights of an integrated ARMA process for forecast error variance

use crate::stats;
use crate::{MathError, Result};

/// Variance below which a process is treated as degenerate
const VARIANCE_FLOOR: f64 = 1e-12;

/// Largest absolute value a single MA coefficient may take
pub const MA_COEFFICIENT_BOUND: f64 = 0.99;

/// Solve the Yule-Walker equations for `order` AR coefficients.
///
/// `autocov` must hold autocovariances for lags `0..=order`. A degenerate
/// (zero-variance) process yields all-zero coefficients instead of an error.
pub fn levinson_durbin(autocov: &[f64], order: usize) -> Result<Vec<f64>> {
    if autocov.len() <= order {
        return Err(MathError::InvalidInput(format!(
            "Levinson-Durbin of order {} needs {} autocovariances, got {}",
            order,
            order + 1,
            autocov.len()
        )));
    }

    let mut phi = vec![0.0; order];
    let mut error = autocov[0];
    if order == 0 || error <= VARIANCE_FLOOR {
        return Ok(phi);
    }

    for k in 0..order {
        let acc = autocov[k + 1]
            - (0..k)
                .map(|j| phi[j] * autocov[k - j])
                .sum::<f64>();
        let reflection = acc / error;

        let previous = phi.clone();
        phi[k] = reflection;
        for j in 0..k {
            phi[j] = previous[j] - reflection * previous[k - 1 - j];
        }

        error *= 1.0 - reflection * reflection;
        if error <= VARIANCE_FLOOR {
            // Perfectly predictable: higher lags add nothing
            break;
        }
    }

    if phi.iter().any(|c| !c.is_finite()) {
        return Err(MathError::CalculationError(
            "Levinson-Durbin produced non-finite coefficients".to_string(),
        ));
    }

    Ok(phi)
}

/// Estimate `order` MA coefficients from the autocorrelation of residuals.
///
/// Each coefficient is clamped to `±MA_COEFFICIENT_BOUND`, and the set is
/// rescaled so the absolute sum stays below one (an invertible MA polynomial).
pub fn ma_from_residuals(residuals: &[f64], order: usize) -> Result<Vec<f64>> {
    if order == 0 {
        return Ok(Vec::new());
    }
    if residuals.len() <= order {
        return Ok(vec![0.0; order]);
    }

    let autocov = stats::autocovariance(residuals, order)?;
    if autocov[0] <= VARIANCE_FLOOR {
        return Ok(vec![0.0; order]);
    }

    let mut theta: Vec<f64> = autocov[1..]
        .iter()
        .map(|c| (c / autocov[0]).clamp(-MA_COEFFICIENT_BOUND, MA_COEFFICIENT_BOUND))
        .collect();

    let total: f64 = theta.iter().map(|t| t.abs()).sum();
    if total >= MA_COEFFICIENT_BOUND {
        let scale = MA_COEFFICIENT_BOUND / total;
        theta.iter_mut().for_each(|t| *t *= scale);
    }

    Ok(theta)
}

/// AR coefficients of `phi(B) (1 - B)^d`, i.e. the ARMA model on the original scale.
pub fn integrated_ar(ar: &[f64], d: usize) -> Vec<f64> {
    // Polynomial 1 - phi_1 B - ... - phi_p B^p
    let mut poly: Vec<f64> = std::iter::once(1.0)
        .chain(ar.iter().map(|c| -c))
        .collect();

    for _ in 0..d {
        let mut next = vec![0.0; poly.len() + 1];
        for (i, c) in poly.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c;
        }
        poly = next;
    }

    poly[1..].iter().map(|c| -c).collect()
}

/// First `count` psi-weights of an ARMA process (`psi_0 = 1`).
///
/// Forecast error variance at step `h` is `sigma^2 * sum(psi_j^2, j < h)`.
pub fn psi_weights(ar: &[f64], ma: &[f64], count: usize) -> Vec<f64> {
    let mut psi = Vec::with_capacity(count);

    for j in 0..count {
        if j == 0 {
            psi.push(1.0);
            continue;
        }

        let mut value = ma.get(j - 1).copied().unwrap_or(0.0);
        for i in 1..=ar.len().min(j) {
            value += ar[i - 1] * psi[j - i];
        }
        psi.push(value);
    }

    psi
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_levinson_ar1() {
        // AR(1) with phi = 0.5 has autocovariances proportional to 0.5^k
        let autocov = vec![1.0, 0.5, 0.25];
        let phi = levinson_durbin(&autocov, 2).unwrap();

        assert_relative_eq!(phi[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(phi[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_levinson_degenerate_process() {
        let phi = levinson_durbin(&[0.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(phi, vec![0.0, 0.0]);

        assert!(levinson_durbin(&[1.0], 2).is_err());
    }

    #[test]
    fn test_ma_from_residuals_is_bounded() {
        let residuals: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let theta = ma_from_residuals(&residuals, 2).unwrap();

        let total: f64 = theta.iter().map(|t| t.abs()).sum();
        assert!(total <= MA_COEFFICIENT_BOUND + 1e-12);
        assert!(theta[0] < 0.0);
    }

    #[test]
    fn test_integrated_ar() {
        assert_eq!(integrated_ar(&[], 1), vec![1.0]);
        // (1 - 0.5B)(1 - B) = 1 - 1.5B + 0.5B^2
        let coeffs = integrated_ar(&[0.5], 1);
        assert_relative_eq!(coeffs[0], 1.5);
        assert_relative_eq!(coeffs[1], -0.5);
        // (1 - B)^2 = 1 - 2B + B^2
        assert_eq!(integrated_ar(&[], 2), vec![2.0, -1.0]);
    }

    #[test]
    fn test_psi_weights() {
        // Random walk: every psi weight is one
        assert_eq!(psi_weights(&[1.0], &[], 4), vec![1.0; 4]);

        // MA(1) with theta = 0.4: psi = [1, 0.4, 0, 0]
        let psi = psi_weights(&[], &[0.4], 4);
        assert_eq!(psi, vec![1.0, 0.4, 0.0, 0.0]);

        // AR(1) with phi = 0.5: psi_j = 0.5^j
        let psi = psi_weights(&[0.5], &[], 3);
        assert_relative_eq!(psi[2], 0.25);
    }
}
