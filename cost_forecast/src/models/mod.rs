//! Forecasting models for cost series

use crate::error::{ForecastError, Result};
use std::fmt::Debug;

/// Forecast result containing predicted values
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    /// Forecasted values
    values: Vec<f64>,
    /// Number of periods forecasted
    horizons: usize,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(values: Vec<f64>, horizons: usize) -> Result<Self> {
        if values.len() != horizons {
            return Err(ForecastError::ForecastingError(format!(
                "Values length ({}) doesn't match horizons ({})",
                values.len(),
                horizons
            )));
        }

        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::ForecastingError(format!(
                "Forecast step {} is not a finite number",
                pos + 1
            )));
        }

        Ok(Self { values, horizons })
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.horizons
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug + Send + Sync {
    /// Generate forecast for future periods
    fn forecast(&self, horizons: usize) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a cost series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on a date-ordered series
    fn train(&self, series: &[f64]) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod arima;

pub use arima::{ArimaModel, ArimaOrder, TrainedArimaModel};
