//! Least-squares regression on small dense design matrices

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Pivot magnitude below which a matrix is treated as singular
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Fitted ridge regression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeFit {
    /// Estimated coefficients, one per design column
    pub coefficients: Vec<f64>,
    /// `(X'X + L)^-1`, the unscaled coefficient covariance
    pub covariance: Vec<Vec<f64>>,
    /// Residual variance `SSR / max(n - k, 1)`
    pub residual_variance: f64,
}

impl RidgeFit {
    /// Linear prediction for a single design row
    pub fn predict(&self, row: &[f64]) -> f64 {
        dot(&self.coefficients, row)
    }

    /// Predictive variance for a design row: `sigma^2 * (1 + x' C x)`
    pub fn predictive_variance(&self, row: &[f64]) -> f64 {
        self.residual_variance * (1.0 + quadratic_form(&self.covariance, row))
    }
}

/// Fit `y ~ X b` by least squares with a per-column ridge penalty.
///
/// `penalties[j]` is added to the diagonal of `X'X` for column `j`; a zero
/// penalty leaves that column unregularised.
pub fn ridge_fit(design: &[Vec<f64>], y: &[f64], penalties: &[f64]) -> Result<RidgeFit> {
    let n = design.len();
    if n == 0 || n != y.len() {
        return Err(MathError::InvalidInput(format!(
            "Design has {} rows but target has {} values",
            n,
            y.len()
        )));
    }

    let k = design[0].len();
    if penalties.len() != k || design.iter().any(|row| row.len() != k) {
        return Err(MathError::InvalidInput(
            "Design rows and penalties must share the same width".to_string(),
        ));
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &target) in design.iter().zip(y) {
        for i in 0..k {
            xty[i] += row[i] * target;
            for j in 0..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for (i, penalty) in penalties.iter().enumerate() {
        xtx[i][i] += penalty;
    }

    let covariance = invert(&xtx)?;
    let coefficients: Vec<f64> = covariance.iter().map(|row| dot(row, &xty)).collect();

    let ssr: f64 = design
        .iter()
        .zip(y)
        .map(|(row, &target)| (target - dot(&coefficients, row)).powi(2))
        .sum();
    let dof = n.saturating_sub(k).max(1);

    Ok(RidgeFit {
        coefficients,
        covariance,
        residual_variance: ssr / dof as f64,
    })
}

/// Invert a square matrix by Gauss-Jordan elimination with partial pivoting
pub fn invert(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    let n = matrix.len();
    if matrix.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(
            "Only square matrices can be inverted".to_string(),
        ));
    }

    let mut a: Vec<Vec<f64>> = matrix.to_vec();
    let mut inv: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .ok_or_else(|| MathError::SingularMatrix("Empty pivot column".to_string()))?;

        if a[pivot][col].abs() < PIVOT_TOLERANCE {
            return Err(MathError::SingularMatrix(format!(
                "Pivot in column {} is numerically zero",
                col
            )));
        }

        a.swap(col, pivot);
        inv.swap(col, pivot);

        let scale = a[col][col];
        for j in 0..n {
            a[col][j] /= scale;
            inv[col][j] /= scale;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[row][j] -= factor * a[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }

    Ok(inv)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn quadratic_form(matrix: &[Vec<f64>], x: &[f64]) -> f64 {
    matrix
        .iter()
        .zip(x)
        .map(|(row, xi)| xi * dot(row, x))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_invert() {
        let m = vec![vec![4.0, 7.0], vec![2.0, 6.0]];
        let inv = invert(&m).unwrap();

        assert_relative_eq!(inv[0][0], 0.6, epsilon = 1e-12);
        assert_relative_eq!(inv[0][1], -0.7, epsilon = 1e-12);
        assert_relative_eq!(inv[1][0], -0.2, epsilon = 1e-12);
        assert_relative_eq!(inv[1][1], 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_invert_singular() {
        let m = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(matches!(invert(&m), Err(MathError::SingularMatrix(_))));
    }

    #[test]
    fn test_ridge_fit_exact_line() {
        // y = 3 + 2x
        let design: Vec<Vec<f64>> = (0..5).map(|x| vec![1.0, x as f64]).collect();
        let y: Vec<f64> = (0..5).map(|x| 3.0 + 2.0 * x as f64).collect();

        let fit = ridge_fit(&design, &y, &[0.0, 0.0]).unwrap();

        assert_relative_eq!(fit.coefficients[0], 3.0, epsilon = 1e-9);
        assert_relative_eq!(fit.coefficients[1], 2.0, epsilon = 1e-9);
        assert_relative_eq!(fit.residual_variance, 0.0, epsilon = 1e-12);
        assert_relative_eq!(fit.predict(&[1.0, 10.0]), 23.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ridge_penalty_shrinks_coefficient() {
        let design: Vec<Vec<f64>> = (0..6).map(|x| vec![1.0, (x % 2) as f64]).collect();
        let y: Vec<f64> = (0..6).map(|x| (x % 2) as f64 * 4.0).collect();

        let plain = ridge_fit(&design, &y, &[0.0, 0.0]).unwrap();
        let shrunk = ridge_fit(&design, &y, &[0.0, 10.0]).unwrap();

        assert!(shrunk.coefficients[1].abs() < plain.coefficients[1].abs());
    }

    #[test]
    fn test_predictive_variance_grows_away_from_data() {
        let design: Vec<Vec<f64>> = (0..8).map(|x| vec![1.0, x as f64]).collect();
        let y = vec![1.0, 2.5, 2.0, 4.5, 4.0, 6.5, 6.0, 8.5];

        let fit = ridge_fit(&design, &y, &[0.0, 0.0]).unwrap();
        let near = fit.predictive_variance(&[1.0, 8.0]);
        let far = fit.predictive_variance(&[1.0, 20.0]);

        assert!(fit.residual_variance > 0.0);
        assert!(far > near);
    }

    #[test]
    fn test_ridge_fit_shape_errors() {
        assert!(ridge_fit(&[], &[], &[]).is_err());
        assert!(ridge_fit(&[vec![1.0]], &[1.0, 2.0], &[0.0]).is_err());
        assert!(ridge_fit(&[vec![1.0]], &[1.0], &[0.0, 0.0]).is_err());
    }
}
