//! Series transforms used around ARMA estimation
//!
//! Differencing removes trend before estimation; integration maps forecasts
//! made on the differenced scale back onto the original scale.

use crate::{MathError, Result};

/// Arithmetic mean of a series
pub fn mean(data: &[f64]) -> Result<f64> {
    if data.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the mean of an empty series".to_string(),
        ));
    }

    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

/// Apply `order` rounds of first differencing.
///
/// Each round shortens the series by one observation.
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

/// Undo `order` rounds of differencing for values that continue `history`.
///
/// `forecasts` are expressed on the `order`-times differenced scale and
/// directly follow the last observation of `history`.
pub fn integrate(history: &[f64], order: usize, forecasts: &[f64]) -> Result<Vec<f64>> {
    if order == 0 {
        return Ok(forecasts.to_vec());
    }

    // levels[k] is the history differenced k times
    let mut levels = Vec::with_capacity(order);
    levels.push(history.to_vec());
    for k in 1..order {
        levels.push(difference(&levels[k - 1], 1)?);
    }

    let mut result = forecasts.to_vec();
    for level in levels.iter().rev() {
        let mut last = *level.last().ok_or_else(|| {
            MathError::InsufficientData("Cannot integrate onto an empty history".to_string())
        })?;
        for value in result.iter_mut() {
            last += *value;
            *value = last;
        }
    }

    Ok(result)
}

/// Biased sample autocovariances of a series for lags `0..=max_lag`.
///
/// The series is centred on its mean before the products are summed and
/// every lag is divided by the full length.
pub fn autocovariance(data: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    if data.len() <= max_lag {
        return Err(MathError::InsufficientData(format!(
            "Autocovariance up to lag {} needs more than {} observations, got {}",
            max_lag,
            max_lag,
            data.len()
        )));
    }

    let n = data.len();
    let mu = mean(data)?;
    let centered: Vec<f64> = data.iter().map(|x| x - mu).collect();

    let acov = (0..=max_lag)
        .map(|k| {
            let sum: f64 = (k..n).map(|i| centered[i] * centered[i - k]).sum();
            sum / n as f64
        })
        .collect();

    Ok(acov)
}
