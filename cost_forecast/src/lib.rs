//! # Cost Forecast
//!
//! Per-item cost forecasting for materials and labor.
//!
//! ## Features
//!
//! - One ARIMA model trained per item from dated cost histories
//! - Models persisted under a reversible, versioned artifact naming scheme
//! - An in-memory model registry reloaded by whole-snapshot swap
//! - Resolution of informal item names (`"Steel"`, `"material_steel"`)
//! - Forecasts with per-request failure isolation
//!
//! ## Quick Start
//!
//! ```no_run
//! use cost_forecast::data::CsvSource;
//! use cost_forecast::models::ArimaModel;
//! use cost_forecast::registry::ModelRegistry;
//! use cost_forecast::service::ForecastService;
//! use cost_forecast::store::{FsModelStore, ModelStore};
//! use cost_forecast::training::TrainingPipeline;
//! use std::sync::Arc;
//!
//! # fn main() -> cost_forecast::error::Result<()> {
//! let store: Arc<dyn ModelStore> = Arc::new(FsModelStore::new("models"));
//!
//! // Fit one model per item
//! let pipeline = TrainingPipeline::new(store.clone(), ArimaModel::new(2, 1, 2)?);
//! let report = pipeline.run(&CsvSource::new("data"))?;
//! println!("{} trained, {} failed", report.succeeded.len(), report.failed.len());
//!
//! // Load them and forecast
//! let service = ForecastService::new(Arc::new(ModelRegistry::load(store)?));
//! let key = service.resolve(Some("material"), Some("Steel"))?;
//! let forecast = service.predict(&key, Some(3))?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod codec;
pub mod config;
pub mod data;
pub mod error;
pub mod models;
pub mod registry;
pub mod resolver;
pub mod sample;
pub mod service;
pub mod store;
pub mod training;

// Re-export commonly used types
pub use crate::api::{ApiError, ForecastApi, ForecastRequest, ForecastResponse, TrainResponse};
pub use crate::codec::{decode, encode, CanonicalKey, EncodedToken};
pub use crate::config::ServiceConfig;
pub use crate::data::{CostObservation, HistoricalSource, ItemKind};
pub use crate::error::{ErrorCategory, ForecastError};
pub use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
pub use crate::registry::ModelRegistry;
pub use crate::resolver::KeyResolver;
pub use crate::service::ForecastService;
pub use crate::store::{FsModelStore, ModelStore};
pub use crate::training::{TrainingPipeline, TrainingReport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
