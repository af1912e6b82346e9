//! Forecast service over a model registry

use crate::codec::CanonicalKey;
use crate::error::{panic_message, ForecastError, Result};
use crate::registry::ModelRegistry;
use crate::resolver::KeyResolver;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Horizon used when a request gives none
pub const DEFAULT_STEPS: usize = 1;

/// Longest horizon a single request may ask for (100 years of monthly periods)
pub const MAX_STEPS: usize = 1200;

/// Validate an already numeric horizon; `None` means the default
pub fn validate_steps(steps: Option<i64>) -> Result<usize> {
    match steps {
        None => Ok(DEFAULT_STEPS),
        Some(n) if n > 0 => usize::try_from(n)
            .ok()
            .filter(|steps| *steps <= MAX_STEPS)
            .ok_or_else(|| {
                ForecastError::InvalidArgument(format!(
                    "steps must be at most {}, got {}",
                    MAX_STEPS, n
                ))
            }),
        Some(n) => Err(ForecastError::InvalidArgument(format!(
            "steps must be a positive integer, got {}",
            n
        ))),
    }
}

/// Parse a horizon as received in a request
pub fn parse_steps(raw: Option<&str>) -> Result<usize> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_STEPS);
    };
    let n = raw.trim().parse::<i64>().map_err(|_| {
        ForecastError::InvalidArgument(format!("steps must be a positive integer, got '{}'", raw))
    })?;
    validate_steps(Some(n))
}

/// Produces forecasts for resolved keys
#[derive(Debug, Clone)]
pub struct ForecastService {
    registry: Arc<ModelRegistry>,
}

impl ForecastService {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Resolve a caller query against the loaded models
    pub fn resolve(&self, kind: Option<&str>, name: Option<&str>) -> Result<CanonicalKey> {
        KeyResolver::new(&self.registry).resolve(kind, name)
    }

    /// Forecast `steps` periods ahead for a registered key.
    ///
    /// A missing horizon means one step. Failures of the model itself, panics
    /// included, come back as [`ForecastError::Prediction`] for this call
    /// only.
    pub fn predict(&self, key: &CanonicalKey, steps: Option<i64>) -> Result<Vec<f64>> {
        let steps = validate_steps(steps)?;
        let model = self.registry.lookup(key)?;
        debug!(key = %key, model = model.name(), steps, "forecasting");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| model.forecast(steps)));
        let failure = match outcome {
            Ok(Ok(result)) => return Ok(result.into_values()),
            Ok(Err(e)) => e,
            Err(payload) => ForecastError::ForecastingError(format!(
                "model panicked: {}",
                panic_message(payload.as_ref())
            )),
        };

        warn!(key = %key, error = %failure, "forecast failed");
        Err(ForecastError::Prediction {
            key: key.to_string(),
            source: Box::new(failure),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        assert_eq!(parse_steps(None).unwrap(), 1);
        assert_eq!(parse_steps(Some(" 4 ")).unwrap(), 4);
        assert!(matches!(parse_steps(Some("0")), Err(ForecastError::InvalidArgument(_))));
        assert!(matches!(parse_steps(Some("-3")), Err(ForecastError::InvalidArgument(_))));
        assert!(matches!(parse_steps(Some("two")), Err(ForecastError::InvalidArgument(_))));
        assert!(matches!(parse_steps(Some("2.5")), Err(ForecastError::InvalidArgument(_))));
        assert!(matches!(parse_steps(Some("1201")), Err(ForecastError::InvalidArgument(_))));
        assert_eq!(parse_steps(Some("1200")).unwrap(), MAX_STEPS);
    }
}
