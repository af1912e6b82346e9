//! Coefficient estimation for ARMA processes
//!
//! Contains:
//! - Levinson-Durbin recursion (Yule-Walker AR estimates)
//! - Ordinary least squares via the normal equations
//! - Hannan-Rissanen two-stage ARMA estimation
//! - Recursive multi-step ARMA forecasting

use crate::series::{autocovariance, mean};
use crate::{ensure_finite, MathError, Result};

/// Relative pivot size below which a system is treated as singular
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Result of fitting an ARMA(p, q) process to a (differenced) series
#[derive(Debug, Clone, PartialEq)]
pub struct ArmaFit {
    /// AR coefficients, lag 1 first
    pub ar: Vec<f64>,
    /// MA coefficients, lag 1 first
    pub ma: Vec<f64>,
    /// Mean removed before estimation
    pub mean: f64,
    /// Centred series the coefficients were estimated on
    pub centered: Vec<f64>,
    /// In-sample innovations of the fitted process
    pub residuals: Vec<f64>,
}

impl ArmaFit {
    /// Variance of the in-sample innovations
    pub fn innovation_variance(&self) -> f64 {
        if self.residuals.is_empty() {
            return 0.0;
        }
        self.residuals.iter().map(|e| e * e).sum::<f64>() / self.residuals.len() as f64
    }
}

/// Solve the Yule-Walker equations for an AR(`order`) process.
///
/// `acov` holds autocovariances for lags `0..=order` at least.
pub fn levinson_durbin(acov: &[f64], order: usize) -> Result<Vec<f64>> {
    if order == 0 {
        return Ok(Vec::new());
    }
    if acov.len() <= order {
        return Err(MathError::InsufficientData(format!(
            "AR({}) needs autocovariances up to lag {}, got {}",
            order,
            order,
            acov.len().saturating_sub(1)
        )));
    }
    ensure_finite(acov, "autocovariance")?;
    if acov[0] <= f64::EPSILON {
        return Err(MathError::Singular(
            "series has no variance to explain".to_string(),
        ));
    }

    let mut coeffs: Vec<f64> = Vec::with_capacity(order);
    let mut error = acov[0];

    for k in 1..=order {
        let acc = acov[k]
            - coeffs
                .iter()
                .enumerate()
                .map(|(j, a)| a * acov[k - 1 - j])
                .sum::<f64>();
        let reflection = acc / error;

        let previous = coeffs.clone();
        for j in 0..previous.len() {
            coeffs[j] = previous[j] - reflection * previous[k - 2 - j];
        }
        coeffs.push(reflection);

        error *= 1.0 - reflection * reflection;
        if error <= 0.0 {
            return Err(MathError::Singular(format!(
                "prediction error vanished at lag {}",
                k
            )));
        }
    }

    ensure_finite(&coeffs, "AR coefficients")?;
    Ok(coeffs)
}

/// Ordinary least squares fit of `target` on the columns of `rows`.
pub fn least_squares(rows: &[Vec<f64>], target: &[f64]) -> Result<Vec<f64>> {
    if rows.len() != target.len() {
        return Err(MathError::InvalidInput(format!(
            "Design has {} rows but target has {} values",
            rows.len(),
            target.len()
        )));
    }
    let cols = rows.first().map(Vec::len).unwrap_or(0);
    if cols == 0 {
        return Ok(Vec::new());
    }
    if rows.len() < cols {
        return Err(MathError::InsufficientData(format!(
            "Least squares with {} parameters needs at least {} rows, got {}",
            cols,
            cols,
            rows.len()
        )));
    }
    if rows.iter().any(|row| row.len() != cols) {
        return Err(MathError::InvalidInput(
            "Design rows have inconsistent widths".to_string(),
        ));
    }

    // Normal equations: (AᵀA) β = Aᵀy
    let mut normal = vec![vec![0.0; cols + 1]; cols];
    for (row, y) in rows.iter().zip(target) {
        for i in 0..cols {
            for j in 0..cols {
                normal[i][j] += row[i] * row[j];
            }
            normal[i][cols] += row[i] * y;
        }
    }

    solve_augmented(normal)
}

/// Gaussian elimination with partial pivoting on an augmented matrix.
fn solve_augmented(mut m: Vec<Vec<f64>>) -> Result<Vec<f64>> {
    let n = m.len();
    let scale = (0..n).map(|i| m[i][i].abs()).fold(0.0, f64::max);
    if scale == 0.0 || !scale.is_finite() {
        return Err(MathError::Singular("design matrix has no signal".to_string()));
    }

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))
            .unwrap_or(col);
        if m[pivot_row][col].abs() < PIVOT_TOLERANCE * scale {
            return Err(MathError::Singular(format!(
                "column {} is linearly dependent on the others",
                col
            )));
        }
        m.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = m[row][col] / m[col][col];
            for k in col..=n {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| m[row][k] * solution[k]).sum();
        solution[row] = (m[row][n] - tail) / m[row][row];
    }

    ensure_finite(&solution, "least squares solution")?;
    Ok(solution)
}

/// In-sample innovations of an ARMA process over a centred series.
///
/// Innovations before the first full lag window are computed from the lags
/// that exist.
pub fn arma_residuals(centered: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut residuals = Vec::with_capacity(centered.len());
    for t in 0..centered.len() {
        let ar_part: f64 = ar
            .iter()
            .enumerate()
            .filter(|(i, _)| t > *i)
            .map(|(i, phi)| phi * centered[t - 1 - i])
            .sum();
        let ma_part: f64 = ma
            .iter()
            .enumerate()
            .filter(|(j, _)| t > *j)
            .map(|(j, theta)| theta * residuals[t - 1 - j])
            .sum();
        residuals.push(centered[t] - ar_part - ma_part);
    }
    residuals
}

/// Estimate an ARMA(`p`, `q`) process with the Hannan-Rissanen procedure.
///
/// A long autoregression supplies innovation estimates, then the series is
/// regressed on its own lags and the lagged innovations. Pure AR orders go
/// straight through Yule-Walker.
pub fn hannan_rissanen(data: &[f64], p: usize, q: usize) -> Result<ArmaFit> {
    ensure_finite(data, "series")?;
    let mu = mean(data)?;
    let centered: Vec<f64> = data.iter().map(|x| x - mu).collect();
    let n = centered.len();

    let (ar, ma) = if q == 0 {
        if n <= p {
            return Err(MathError::InsufficientData(format!(
                "AR({}) needs more than {} observations, got {}",
                p, p, n
            )));
        }
        let ar = levinson_durbin(&autocovariance(&centered, p)?, p)?;
        (ar, Vec::new())
    } else {
        let long_order = p + q + 2;
        let start = long_order + p.max(q);
        if n < start + p + q + 1 {
            return Err(MathError::InsufficientData(format!(
                "ARMA({},{}) needs at least {} observations, got {}",
                p,
                q,
                start + p + q + 1,
                n
            )));
        }

        let long_ar = levinson_durbin(&autocovariance(&centered, long_order)?, long_order)?;
        let mut innovations = vec![0.0; n];
        for t in long_order..n {
            let fitted: f64 = long_ar
                .iter()
                .enumerate()
                .map(|(i, a)| a * centered[t - 1 - i])
                .sum();
            innovations[t] = centered[t] - fitted;
        }

        let mut rows = Vec::with_capacity(n - start);
        let mut target = Vec::with_capacity(n - start);
        for t in start..n {
            let mut row = Vec::with_capacity(p + q);
            row.extend((1..=p).map(|i| centered[t - i]));
            row.extend((1..=q).map(|j| innovations[t - j]));
            rows.push(row);
            target.push(centered[t]);
        }

        let mut coeffs = least_squares(&rows, &target)?;
        let ma = coeffs.split_off(p);
        (coeffs, ma)
    };

    let residuals = arma_residuals(&centered, &ar, &ma);
    ensure_finite(&residuals, "residuals")?;

    Ok(ArmaFit {
        ar,
        ma,
        mean: mu,
        centered,
        residuals,
    })
}

/// Forecast `steps` values of a centred ARMA process.
///
/// Future innovations are taken as zero, so the MA terms only act on the
/// first `q` steps.
pub fn arma_forecast(
    centered: &[f64],
    residuals: &[f64],
    ar: &[f64],
    ma: &[f64],
    steps: usize,
) -> Vec<f64> {
    let mut history = centered.to_vec();
    let mut innovations = residuals.to_vec();

    for _ in 0..steps {
        let ar_part: f64 = ar
            .iter()
            .enumerate()
            .filter_map(|(i, phi)| history.len().checked_sub(i + 1).map(|idx| phi * history[idx]))
            .sum();
        let ma_part: f64 = ma
            .iter()
            .enumerate()
            .filter_map(|(j, theta)| {
                innovations
                    .len()
                    .checked_sub(j + 1)
                    .map(|idx| theta * innovations[idx])
            })
            .sum();

        history.push(ar_part + ma_part);
        innovations.push(0.0);
    }

    history.split_off(centered.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-noise so tests do not need an RNG
    fn noise(len: usize) -> Vec<f64> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state % 10_000) as f64 / 5_000.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn test_levinson_durbin_ar1() {
        // AR(1) with phi = 0.5 has rho(k) = 0.5^k
        let acov = vec![1.0, 0.5, 0.25];
        let coeffs = levinson_durbin(&acov, 2).unwrap();

        assert!((coeffs[0] - 0.5).abs() < 1e-12);
        assert!(coeffs[1].abs() < 1e-12);
    }

    #[test]
    fn test_levinson_durbin_rejects_constant_series() {
        let acov = vec![0.0, 0.0];
        assert!(matches!(
            levinson_durbin(&acov, 1),
            Err(MathError::Singular(_))
        ));
    }

    #[test]
    fn test_least_squares_exact_fit() {
        // y = 2a - b
        let rows = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![2.0, 1.0],
        ];
        let target = vec![2.0, -1.0, 1.0, 3.0];
        let beta = least_squares(&rows, &target).unwrap();

        assert!((beta[0] - 2.0).abs() < 1e-9);
        assert!((beta[1] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_least_squares_collinear_columns() {
        let rows = vec![vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 6.0]];
        let target = vec![1.0, 2.0, 3.0];

        assert!(matches!(
            least_squares(&rows, &target),
            Err(MathError::Singular(_))
        ));
    }

    #[test]
    fn test_hannan_rissanen_recovers_ar_sign() {
        let eps = noise(400);
        let mut series = vec![0.0];
        for t in 1..eps.len() {
            series.push(0.7 * series[t - 1] + eps[t]);
        }

        let fit = hannan_rissanen(&series, 1, 1).unwrap();
        assert_eq!(fit.ar.len(), 1);
        assert_eq!(fit.ma.len(), 1);
        assert!(fit.ar[0] > 0.4 && fit.ar[0] < 1.0);
        assert_eq!(fit.residuals.len(), series.len());
        assert!(fit.innovation_variance() > 0.0);
    }

    #[test]
    fn test_hannan_rissanen_short_series() {
        let series = noise(8);
        assert!(matches!(
            hannan_rissanen(&series, 2, 2),
            Err(MathError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_arma_forecast_decays_towards_mean() {
        let forecast = arma_forecast(&[1.0], &[0.0], &[0.5], &[], 3);
        assert_eq!(forecast, vec![0.5, 0.25, 0.125]);
    }

    #[test]
    fn test_arma_forecast_ma_terms_use_last_innovation() {
        let forecast = arma_forecast(&[0.0, 0.0], &[0.0, 2.0], &[], &[0.5], 2);
        assert_eq!(forecast, vec![1.0, 0.0]);
    }
}
