//! Service configuration
//!
//! Defaults, overridden by a JSON file and/or `COST_FORECAST_*` environment
//! variables. A `.env` file in the working directory is honoured.

use crate::error::{ForecastError, Result};
use crate::models::ArimaOrder;
use crate::store::DEFAULT_EXTENSION;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const ENV_MODEL_DIR: &str = "COST_FORECAST_MODEL_DIR";
pub const ENV_DATA_DIR: &str = "COST_FORECAST_DATA_DIR";
pub const ENV_ARTIFACT_EXT: &str = "COST_FORECAST_ARTIFACT_EXT";
pub const ENV_ARIMA_ORDER: &str = "COST_FORECAST_ARIMA_ORDER";
pub const ENV_PARALLEL: &str = "COST_FORECAST_PARALLEL";

/// Settings shared by the training pipeline and the forecast service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Directory holding model artifacts
    pub model_dir: PathBuf,
    /// Directory holding `material_history.csv` and `labor_history.csv`
    pub data_dir: PathBuf,
    /// Artifact file extension, without the dot
    pub artifact_extension: String,
    /// Order fitted for every item
    pub arima: ArimaOrder,
    /// Fit items in parallel
    pub parallel_training: bool,
    /// Minimum observations per item; never below what `arima` needs
    pub min_observations: Option<usize>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            data_dir: PathBuf::from("data"),
            artifact_extension: DEFAULT_EXTENSION.to_string(),
            arima: ArimaOrder::default(),
            parallel_training: false,
            min_observations: None,
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by the environment
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env()
    }

    /// Load a JSON config file; absent fields keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ForecastError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            ForecastError::Config(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validated()
    }

    /// Apply `COST_FORECAST_*` variables on top of this config
    pub fn merge_env(mut self) -> Result<Self> {
        // A missing .env file is fine
        dotenvy::dotenv().ok();

        if let Some(dir) = read_var(ENV_MODEL_DIR) {
            self.model_dir = PathBuf::from(dir);
        }
        if let Some(dir) = read_var(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(ext) = read_var(ENV_ARTIFACT_EXT) {
            self.artifact_extension = ext;
        }
        if let Some(order) = read_var(ENV_ARIMA_ORDER) {
            self.arima = order
                .parse()
                .map_err(|e| ForecastError::Config(format!("{}: {}", ENV_ARIMA_ORDER, e)))?;
        }
        if let Some(flag) = read_var(ENV_PARALLEL) {
            self.parallel_training = parse_bool(&flag).ok_or_else(|| {
                ForecastError::Config(format!("{}: '{}' is not a boolean", ENV_PARALLEL, flag))
            })?;
        }

        self.validated()
    }

    fn validated(mut self) -> Result<Self> {
        self.artifact_extension = self.artifact_extension.trim_start_matches('.').to_string();
        if self.artifact_extension.is_empty() {
            return Err(ForecastError::Config(
                "artifact extension must not be empty".to_string(),
            ));
        }
        // Orders from serde bypass ArimaOrder::new
        let ArimaOrder { p, d, q } = self.arima;
        self.arima =
            ArimaOrder::new(p, d, q).map_err(|e| ForecastError::Config(e.to_string()))?;
        Ok(self)
    }
}

fn read_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
