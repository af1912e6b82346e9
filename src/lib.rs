//! # Cost Forecast Workspace
//!
//! Umbrella crate for the cost forecasting workspace.
//!
//! - [`math`]: numeric kernels (differencing, autocovariance, ARMA estimation)
//! - [`forecast`]: training pipeline, model store, registry and forecast service
//!
//! ## Example
//!
//! ```
//! use cost_forecast_workspace::forecast::codec::{decode, encode, CanonicalKey};
//! use cost_forecast_workspace::forecast::data::ItemKind;
//!
//! let key = CanonicalKey::new(ItemKind::Material, "Steel");
//! assert_eq!(key.as_str(), "material_Steel");
//! assert_eq!(decode(&encode(&key)).unwrap(), key);
//! ```

pub use cost_forecast as forecast;
pub use cost_math as math;

/// Version of the workspace crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
