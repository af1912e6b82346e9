//! # Cost Math
//!
//! Numeric building blocks for fitting and running ARIMA models on cost
//! histories: differencing and integration of series, sample
//! autocovariances, Levinson-Durbin recursion, ordinary least squares and
//! Hannan-Rissanen estimation of ARMA coefficients.

use thiserror::Error;

pub mod estimation;
pub mod series;

pub use estimation::{
    arma_forecast, arma_residuals, hannan_rissanen, least_squares, levinson_durbin, ArmaFit,
};
pub use series::{autocovariance, difference, integrate, mean};

/// Errors that can occur in numeric calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Singular system: {0}")]
    Singular(String),

    #[error("Non-finite value encountered: {0}")]
    NonFinite(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Fail with [`MathError::NonFinite`] when any value is NaN or infinite.
pub fn ensure_finite(values: &[f64], what: &str) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(MathError::NonFinite(format!("{} contains NaN or infinite values", what)))
    }
}
