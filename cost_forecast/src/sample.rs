//! Synthetic cost histories for demos and tests

use crate::data::{CostObservation, ItemKind};
use crate::error::{ForecastError, Result};
use chrono::{Months, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Shape of one synthetic item history
#[derive(Debug, Clone, PartialEq)]
pub struct SampleItem {
    pub kind: ItemKind,
    pub name: String,
    /// Cost of the first month
    pub base: f64,
    /// Average month-on-month change
    pub drift: f64,
    /// Standard deviation of the monthly shock
    pub volatility: f64,
}

impl SampleItem {
    pub fn new(kind: ItemKind, name: &str, base: f64, drift: f64, volatility: f64) -> Self {
        Self {
            kind,
            name: name.to_string(),
            base,
            drift,
            volatility,
        }
    }
}

/// Items used by the `sample` command
pub fn default_items() -> Vec<SampleItem> {
    vec![
        SampleItem::new(ItemKind::Material, "Steel", 820.0, 4.5, 12.0),
        SampleItem::new(ItemKind::Material, "Cement", 95.0, 0.6, 1.8),
        SampleItem::new(ItemKind::Material, "Timber", 410.0, -1.2, 9.0),
        SampleItem::new(ItemKind::Material, "Copper Wire", 8.4, 0.05, 0.2),
        SampleItem::new(ItemKind::Labor, "Electrician", 42.0, 0.3, 0.8),
        SampleItem::new(ItemKind::Labor, "Mason", 31.0, 0.2, 0.6),
    ]
}

/// Monthly observations for each item starting at `start`.
///
/// Shocks are AR(1) with coefficient 0.5 around the drift, so the output is
/// a reasonable fit for the default ARIMA order. The same seed always yields
/// the same history.
pub fn generate_history(
    items: &[SampleItem],
    start: NaiveDate,
    months: u32,
    seed: u64,
) -> Result<Vec<CostObservation>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut observations = Vec::with_capacity(items.len() * months as usize);

    for item in items {
        let noise = Normal::new(0.0, item.volatility).map_err(|e| {
            ForecastError::InvalidArgument(format!("volatility for {}: {}", item.name, e))
        })?;

        let mut cost = item.base;
        let mut shock = 0.0;
        for month in 0..months {
            let date = start.checked_add_months(Months::new(month)).ok_or_else(|| {
                ForecastError::InvalidArgument(format!("{} months past {} is out of range", month, start))
            })?;
            observations.push(CostObservation::new(date, (cost * 100.0).round() / 100.0, &*item.name));

            shock = 0.5 * shock + noise.sample(&mut rng);
            cost = (cost + item.drift + shock).max(0.01);
        }
    }

    Ok(observations)
}
