//! Training pipeline: one ARIMA model per item
//!
//! A run fetches the material and labor histories up front. If either fetch
//! fails the run fails as a whole and nothing is written. Otherwise every
//! item is fitted and saved independently, and its outcome lands in the
//! [`TrainingReport`].

use crate::codec::CanonicalKey;
use crate::data::{group_series, HistoricalSource, ItemKind, ItemSeries};
use crate::error::{panic_message, ForecastError, Result};
use crate::models::{ArimaModel, ForecastModel};
use crate::store::ModelStore;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Item whose model could not be trained or saved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub item: CanonicalKey,
    pub error: String,
}

/// Per-item outcomes of one training run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub succeeded: Vec<CanonicalKey>,
    pub failed: Vec<ItemFailure>,
}

impl TrainingReport {
    /// Number of items attempted
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Fits and persists one model per item
pub struct TrainingPipeline {
    store: Arc<dyn ModelStore>,
    model: ArimaModel,
    parallel: bool,
    min_observations: usize,
}

impl TrainingPipeline {
    pub fn new(store: Arc<dyn ModelStore>, model: ArimaModel) -> Self {
        let min_observations = model.order().min_observations();
        Self {
            store,
            model,
            parallel: false,
            min_observations,
        }
    }

    /// Fit items on the rayon pool; report order is unchanged
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Require at least this many observations per item.
    ///
    /// Values below what the model order needs are ignored.
    pub fn with_min_observations(mut self, min_observations: usize) -> Self {
        self.min_observations = min_observations.max(self.model.order().min_observations());
        self
    }

    pub fn model(&self) -> &ArimaModel {
        &self.model
    }

    /// Train every item the source knows about.
    ///
    /// Returns `Err` only when the source cannot be read. The registry is not
    /// reloaded here.
    pub fn run(&self, source: &dyn HistoricalSource) -> Result<TrainingReport> {
        let started = Instant::now();
        info!(source = %source.describe(), model = self.model.name(), "training run started");

        let mut work: Vec<(CanonicalKey, ItemSeries)> = Vec::new();
        for kind in ItemKind::ALL {
            let observations = source.fetch(kind).map_err(|e| {
                warn!(kind = %kind, error = %e, "training run aborted");
                match e {
                    ForecastError::DataSource(_) => e,
                    other => ForecastError::DataSource(other.to_string()),
                }
            })?;

            for series in group_series(observations) {
                work.push((CanonicalKey::new(kind, &series.item), series));
            }
        }

        let outcomes: Vec<(CanonicalKey, Result<()>)> = if self.parallel {
            work.into_par_iter()
                .map(|(key, series)| {
                    let outcome = self.train_item(&key, &series);
                    (key, outcome)
                })
                .collect()
        } else {
            work.into_iter()
                .map(|(key, series)| {
                    let outcome = self.train_item(&key, &series);
                    (key, outcome)
                })
                .collect()
        };

        let mut report = TrainingReport::default();
        for (key, outcome) in outcomes {
            match outcome {
                Ok(()) => {
                    info!(key = %key, "trained model");
                    report.succeeded.push(key);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "training failed");
                    report.failed.push(ItemFailure {
                        item: key,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "training run finished"
        );
        Ok(report)
    }

    /// Fit and save one item; a panic becomes that item's failure
    fn train_item(&self, key: &CanonicalKey, series: &ItemSeries) -> Result<()> {
        panic::catch_unwind(AssertUnwindSafe(|| self.fit_and_save(key, series))).unwrap_or_else(
            |payload| {
                Err(ForecastError::Training(format!(
                    "training {} panicked: {}",
                    key,
                    panic_message(payload.as_ref())
                )))
            },
        )
    }

    fn fit_and_save(&self, key: &CanonicalKey, series: &ItemSeries) -> Result<()> {
        if series.len() < self.min_observations {
            return Err(ForecastError::Training(format!(
                "Insufficient data for {}. Need at least {} observations, got {}",
                key,
                self.min_observations,
                series.len()
            )));
        }
        let trained = self.model.train(&series.costs())?;
        self.store.save(key, &trained)
    }
}

impl std::fmt::Debug for TrainingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingPipeline")
            .field("model", &self.model)
            .field("parallel", &self.parallel)
            .field("min_observations", &self.min_observations)
            .finish()
    }
}
