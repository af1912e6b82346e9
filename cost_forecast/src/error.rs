//! Error types for the cost_forecast crate

use cost_math::MathError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Custom error types for the cost_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// The historical data source could not be read
    #[error("Data source error: {0}")]
    DataSource(String),

    /// An artifact token is not valid output of the name encoding
    #[error("Decode error: {0}")]
    Decode(String),

    /// No model is registered under the requested item
    #[error("Not found: {0}")]
    NotFound(String),

    /// A required request parameter is absent
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    /// A request parameter is present but malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A model could not produce a forecast
    #[error("Forecasting error: {0}")]
    ForecastingError(String),

    /// Forecast failure reported back to the caller of one prediction
    #[error("Prediction failed for {key}: {source}")]
    Prediction {
        key: String,
        source: Box<ForecastError>,
    },

    /// A model could not be fitted
    #[error("Training error: {0}")]
    Training(String),

    /// Error from numeric kernels
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Error from artifact (de)serialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error from configuration loading
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::DataSource(err.to_string())
    }
}

/// Caller-facing classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    MissingParameter,
    InvalidArgument,
    NotFound,
    PredictionError,
    TrainingError,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::MissingParameter => "missing-parameter",
            ErrorCategory::InvalidArgument => "invalid-argument",
            ErrorCategory::NotFound => "not-found",
            ErrorCategory::PredictionError => "prediction-error",
            ErrorCategory::TrainingError => "training-error",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text carried by a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

impl ForecastError {
    /// Category reported to the caller at the request boundary
    pub fn category(&self) -> ErrorCategory {
        match self {
            ForecastError::MissingParameter(_) => ErrorCategory::MissingParameter,
            ForecastError::InvalidArgument(_) => ErrorCategory::InvalidArgument,
            ForecastError::NotFound(_) => ErrorCategory::NotFound,
            ForecastError::Prediction { .. } | ForecastError::ForecastingError(_) => {
                ErrorCategory::PredictionError
            }
            ForecastError::Training(_) | ForecastError::DataSource(_) => {
                ErrorCategory::TrainingError
            }
            _ => ErrorCategory::Internal,
        }
    }
}
