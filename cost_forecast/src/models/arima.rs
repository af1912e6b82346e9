//! ARIMA models for cost forecasting

use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use cost_math::{
    arma_forecast, autocovariance, difference, hannan_rissanen, integrate, ArmaFit, MathError,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Orders of an ARIMA(p, d, q) model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    /// AR order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// MA order
    pub q: usize,
}

impl ArimaOrder {
    /// Validate and build an order
    pub fn new(p: usize, d: usize, q: usize) -> Result<Self> {
        if p > 10 {
            return Err(ForecastError::InvalidArgument(
                "AR order must be <= 10".to_string(),
            ));
        }
        if d > 2 {
            return Err(ForecastError::InvalidArgument(
                "Differencing order must be <= 2".to_string(),
            ));
        }
        if q > 10 {
            return Err(ForecastError::InvalidArgument(
                "MA order must be <= 10".to_string(),
            ));
        }
        Ok(Self { p, d, q })
    }

    /// Shortest series this order will be fitted on
    pub fn min_observations(&self) -> usize {
        self.p + self.d + self.q + 10
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self { p: 2, d: 1, q: 2 }
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

impl FromStr for ArimaOrder {
    type Err = ForecastError;

    /// Parse `p,d,q`
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(ForecastError::InvalidArgument(format!(
                "ARIMA order '{}' must look like p,d,q",
                s
            )));
        }

        let parse = |part: &str| {
            part.parse::<usize>().map_err(|_| {
                ForecastError::InvalidArgument(format!("ARIMA order '{}' is not numeric", s))
            })
        };
        Self::new(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?)
    }
}

/// ARIMA model (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    /// Model orders
    order: ArimaOrder,
}

/// Trained ARIMA model
///
/// Only the tail of the history that forecasting needs is kept, so the
/// serialized form stays small regardless of series length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedArimaModel {
    /// Name of the model
    name: String,
    /// Model orders
    order: ArimaOrder,
    /// Fitted AR coefficients
    ar_coefficients: Vec<f64>,
    /// Fitted MA coefficients
    ma_coefficients: Vec<f64>,
    /// Mean of the differenced series
    mean: f64,
    /// Innovation variance of the fit
    sigma2: f64,
    /// Number of observations trained on
    observations: usize,
    /// Last `d + 1` raw observations
    history_tail: Vec<f64>,
    /// Last centred values of the differenced series
    centered_tail: Vec<f64>,
    /// Last in-sample innovations
    residual_tail: Vec<f64>,
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(p: usize, d: usize, q: usize) -> Result<Self> {
        Ok(Self::from_order(ArimaOrder::new(p, d, q)?))
    }

    pub fn from_order(order: ArimaOrder) -> Self {
        Self {
            name: format!("ARIMA{}", order),
            order,
        }
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    fn estimate(&self, differenced: &[f64]) -> Result<ArmaFit> {
        let ArimaOrder { p, q, .. } = self.order;

        let reason = match hannan_rissanen(differenced, p, q) {
            Ok(fit) => return Ok(fit),
            Err(MathError::Singular(reason)) => reason,
            Err(err) => return Err(err.into()),
        };

        if q > 0 {
            debug!(%reason, "MA stage is singular, refitting {} without MA terms", self.name);
            match hannan_rissanen(differenced, p, 0) {
                Ok(fit) => return Ok(fit),
                Err(MathError::Singular(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }

        // Perfectly regular increments leave nothing to explain beyond drift
        if autocovariance(differenced, 0)?[0] <= f64::EPSILON {
            debug!("{} fitted as pure drift", self.name);
            let mean = cost_math::mean(differenced)?;
            return Ok(ArmaFit {
                ar: vec![0.0; p],
                ma: vec![0.0; q],
                mean,
                centered: differenced.iter().map(|x| x - mean).collect(),
                residuals: vec![0.0; differenced.len()],
            });
        }

        Err(ForecastError::Training(format!(
            "{} estimation did not converge: {}",
            self.name, reason
        )))
    }
}

fn tail(values: &[f64], len: usize) -> Vec<f64> {
    values[values.len().saturating_sub(len)..].to_vec()
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, series: &[f64]) -> Result<TrainedArimaModel> {
        let ArimaOrder { p, d, q } = self.order;
        let required = self.order.min_observations();
        if series.len() < required {
            return Err(ForecastError::Training(format!(
                "Insufficient data for {}. Need at least {} observations, got {}",
                self.name,
                required,
                series.len()
            )));
        }
        cost_math::ensure_finite(series, "cost series")?;

        let differenced = difference(series, d)?;
        let fit = self.estimate(&differenced)?;
        let sigma2 = fit.innovation_variance();
        let lags = p.max(q).max(1);

        Ok(TrainedArimaModel {
            name: self.name.clone(),
            order: self.order,
            ar_coefficients: fit.ar,
            ma_coefficients: fit.ma,
            mean: fit.mean,
            sigma2,
            observations: series.len(),
            history_tail: tail(series, d + 1),
            centered_tail: tail(&fit.centered, lags),
            residual_tail: tail(&fit.residuals, lags),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedArimaModel {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// Innovation variance of the fit
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Number of observations the model was trained on
    pub fn observations(&self) -> usize {
        self.observations
    }

    /// Check that the stored state can drive a forecast
    fn check_state(&self) -> Result<()> {
        let incompatible = |what: &str| -> Result<()> {
            Err(ForecastError::ForecastingError(format!(
                "{} has incompatible state: {}",
                self.name, what
            )))
        };

        if self.history_tail.len() < self.order.d + 1 {
            return incompatible("history shorter than differencing order");
        }
        if self.centered_tail.len() < self.ar_coefficients.len() {
            return incompatible("fewer stored lags than AR coefficients");
        }
        if self.residual_tail.len() < self.ma_coefficients.len() {
            return incompatible("fewer stored innovations than MA coefficients");
        }
        let mut parameters = self
            .ar_coefficients
            .iter()
            .chain(&self.ma_coefficients)
            .chain(&self.history_tail)
            .chain(&self.centered_tail)
            .chain(&self.residual_tail)
            .chain(std::iter::once(&self.mean));
        if parameters.any(|v| !v.is_finite()) {
            return incompatible("non-finite parameters");
        }
        Ok(())
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        if horizon == 0 {
            return Err(ForecastError::ForecastingError(
                "Forecast horizon must be at least one step".to_string(),
            ));
        }
        self.check_state()?;

        let differenced: Vec<f64> = arma_forecast(
            &self.centered_tail,
            &self.residual_tail,
            &self.ar_coefficients,
            &self.ma_coefficients,
            horizon,
        )
        .into_iter()
        .map(|x| x + self.mean)
        .collect();

        let forecasts = integrate(&self.history_tail, self.order.d, &differenced)?;
        ForecastResult::new(forecasts, horizon)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
