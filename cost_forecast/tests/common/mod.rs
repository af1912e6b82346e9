#![allow(dead_code)]

use chrono::NaiveDate;
use cost_forecast::codec::{encode, CanonicalKey};
use cost_forecast::data::{CostObservation, HistoricalSource, ItemKind, MemorySource};
use cost_forecast::error::{ForecastError, Result};
use cost_forecast::models::{ArimaModel, ForecastModel, TrainedArimaModel};
use cost_forecast::sample::{generate_history, SampleItem};
use cost_forecast::store::ModelStore;

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

/// Seeded monthly history for the given items
pub fn history(items: &[SampleItem], months: u32) -> Vec<CostObservation> {
    generate_history(items, start_date(), months, 11).unwrap()
}

pub fn material(name: &str) -> SampleItem {
    SampleItem::new(ItemKind::Material, name, 500.0, 2.0, 8.0)
}

pub fn labor(name: &str) -> SampleItem {
    SampleItem::new(ItemKind::Labor, name, 40.0, 0.2, 0.7)
}

/// Seeded cost series of `len` monthly points
pub fn cost_series(len: usize, seed: u64) -> Vec<f64> {
    let item = SampleItem::new(ItemKind::Material, "series", 100.0, 0.5, 2.0);
    generate_history(&[item], start_date(), len as u32, seed)
        .unwrap()
        .into_iter()
        .map(|obs| obs.cost)
        .collect()
}

pub fn trained_model(seed: u64) -> TrainedArimaModel {
    ArimaModel::new(2, 1, 2)
        .unwrap()
        .train(&cost_series(48, seed))
        .unwrap()
}

/// Save a freshly trained model under `key`
pub fn save_model(store: &dyn ModelStore, key: &str, seed: u64) -> CanonicalKey {
    let key = CanonicalKey::from_raw(key);
    store.save(&key, &trained_model(seed)).unwrap();
    key
}

/// Artifact body whose model cannot forecast: no history to integrate onto
pub fn incompatible_artifact(key: &str) -> Vec<u8> {
    serde_json::json!({
        "format_version": 1,
        "key": key,
        "trained_at": "2024-01-01T00:00:00Z",
        "model": {
            "name": "ARIMA(2,1,2)",
            "order": { "p": 2, "d": 1, "q": 2 },
            "ar_coefficients": [0.3, 0.1],
            "ma_coefficients": [0.2, 0.0],
            "mean": 0.5,
            "sigma2": 1.0,
            "observations": 30,
            "history_tail": [],
            "centered_tail": [0.1, -0.2],
            "residual_tail": [0.0, 0.1]
        }
    })
    .to_string()
    .into_bytes()
}

/// Write an incompatible model straight into the store
pub fn save_incompatible(store: &dyn ModelStore, key: &str) -> CanonicalKey {
    let key = CanonicalKey::from_raw(key);
    store
        .write_artifact(&encode(&key), &incompatible_artifact(key.as_str()))
        .unwrap();
    key
}

/// Source that cannot be reached
#[derive(Debug, Default)]
pub struct UnreachableSource;

impl HistoricalSource for UnreachableSource {
    fn fetch(&self, _kind: ItemKind) -> Result<Vec<CostObservation>> {
        Err(ForecastError::DataSource("connection refused".to_string()))
    }

    fn describe(&self) -> String {
        "unreachable".to_string()
    }
}

/// Source whose labor table fails after materials were read
#[derive(Debug)]
pub struct LaborFailsSource(pub MemorySource);

impl HistoricalSource for LaborFailsSource {
    fn fetch(&self, kind: ItemKind) -> Result<Vec<CostObservation>> {
        match kind {
            ItemKind::Material => self.0.fetch(kind),
            ItemKind::Labor => Err(ForecastError::DataError(
                "labor_history has no 'labor' column".to_string(),
            )),
        }
    }

    fn describe(&self) -> String {
        "labor-fails".to_string()
    }
}
