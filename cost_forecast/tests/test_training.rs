mod common;

use chrono::NaiveDate;
use common::{history, labor, material, LaborFailsSource, UnreachableSource};
use cost_forecast::codec::{encode, CanonicalKey, EncodedToken};
use cost_forecast::data::{CostObservation, ItemKind, MemorySource};
use cost_forecast::error::{ForecastError, Result};
use cost_forecast::models::ArimaModel;
use cost_forecast::registry::ModelRegistry;
use cost_forecast::store::{ArtifactIter, FsModelStore, MemoryModelStore, ModelStore};
use cost_forecast::training::TrainingPipeline;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;
use tempfile::TempDir;

fn keys(raw: &[&str]) -> Vec<CanonicalKey> {
    raw.iter().map(|k| CanonicalKey::from_raw(*k)).collect()
}

/// Three materials, one with too little history, and two labor items
fn mixed_source() -> MemorySource {
    let mut materials = history(&[material("Steel"), material("Cement")], 36);
    materials.extend(history(&[material("Timber")], 5));
    let labor_rows = history(&[labor("Mason"), labor("Electrician")], 30);

    MemorySource::new()
        .with(ItemKind::Material, materials)
        .with(ItemKind::Labor, labor_rows)
}

/// Store that panics when asked to write one particular artifact
struct PanicOnWrite {
    inner: MemoryModelStore,
    poisoned: EncodedToken,
}

impl ModelStore for PanicOnWrite {
    fn list(&self) -> Result<ArtifactIter<'_>> {
        self.inner.list()
    }

    fn write_artifact(&self, token: &EncodedToken, bytes: &[u8]) -> Result<()> {
        if *token == self.poisoned {
            panic!("disk on fire");
        }
        self.inner.write_artifact(token, bytes)
    }
}

fn pipeline(store: Arc<dyn ModelStore>) -> TrainingPipeline {
    TrainingPipeline::new(store, ArimaModel::new(2, 1, 2).unwrap())
}

#[rstest]
#[case::sequential(false)]
#[case::parallel(true)]
fn test_one_failing_item_does_not_abort_run(#[case] parallel: bool) {
    let store = Arc::new(MemoryModelStore::new());
    let report = pipeline(store.clone())
        .with_parallel(parallel)
        .run(&mixed_source())
        .unwrap();

    assert_eq!(
        report.succeeded,
        keys(&[
            "material_Steel",
            "material_Cement",
            "labor_Mason",
            "labor_Electrician"
        ])
    );
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].item.as_str(), "material_Timber");
    assert!(report.failed[0].error.contains("Insufficient data"));
    assert_eq!(report.attempted(), 5);
    assert_eq!(store.len(), 4);
}

#[test]
fn test_three_materials_one_failure() {
    let mut rows = history(&[material("Steel"), material("Cement")], 40);
    rows.extend(history(&[material("Sand")], 8));
    let source = MemorySource::new().with(ItemKind::Material, rows);

    let report = pipeline(Arc::new(MemoryModelStore::new()))
        .run(&source)
        .unwrap();

    assert_eq!(report.succeeded.len(), 2);
    assert_eq!(report.failed.len(), 1);
}

#[test]
fn test_non_finite_costs_fail_only_that_item() {
    let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
    let mut rows = history(&[material("Steel")], 30);
    rows.extend((0..30).map(|i| {
        let cost = if i == 10 { f64::NAN } else { 10.0 + i as f64 };
        CostObservation::new(start + chrono::Duration::days(i), cost, "Glass")
    }));
    let source = MemorySource::new().with(ItemKind::Material, rows);

    let report = pipeline(Arc::new(MemoryModelStore::new()))
        .run(&source)
        .unwrap();

    assert_eq!(report.succeeded, keys(&["material_Steel"]));
    assert_eq!(report.failed[0].item.as_str(), "material_Glass");
}

#[test]
fn test_unreachable_source_fails_whole_run() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FsModelStore::new(dir.path()));

    let result = pipeline(store.clone()).run(&UnreachableSource);

    assert!(matches!(result, Err(ForecastError::DataSource(_))));
    assert_eq!(store.list().unwrap().count(), 0);
}

#[test]
fn test_second_fetch_failure_writes_nothing() {
    let store = Arc::new(MemoryModelStore::new());
    let source = LaborFailsSource(
        MemorySource::new().with(ItemKind::Material, history(&[material("Steel")], 30)),
    );

    let result = pipeline(store.clone()).run(&source);

    match result {
        Err(ForecastError::DataSource(message)) => assert!(message.contains("labor")),
        other => panic!("expected data source failure, got {:?}", other),
    }
    assert!(store.is_empty());
}

#[test]
fn test_empty_source_gives_empty_report() {
    let report = pipeline(Arc::new(MemoryModelStore::new()))
        .run(&MemorySource::new())
        .unwrap();
    assert_eq!(report.attempted(), 0);
}

#[test]
fn test_min_observations_override() {
    let source = MemorySource::new().with(ItemKind::Labor, history(&[labor("Mason")], 20));

    let report = pipeline(Arc::new(MemoryModelStore::new()))
        .with_min_observations(24)
        .run(&source)
        .unwrap();
    assert_eq!(report.failed.len(), 1);

    // never below what the order itself needs
    let report = pipeline(Arc::new(MemoryModelStore::new()))
        .with_min_observations(3)
        .run(&MemorySource::new().with(ItemKind::Labor, history(&[labor("Mason")], 10)))
        .unwrap();
    assert_eq!(report.failed.len(), 1);
}

#[test]
fn test_retraining_overwrites_and_registry_sees_result() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn ModelStore> = Arc::new(FsModelStore::new(dir.path()));
    let source = MemorySource::new().with(ItemKind::Material, history(&[material("Steel")], 30));

    pipeline(store.clone()).run(&source).unwrap();
    pipeline(store.clone()).run(&source).unwrap();

    let registry = ModelRegistry::load(store).unwrap();
    assert_eq!(registry.len(), 1);
    assert!(registry.snapshot().contains("material_Steel"));
}

#[rstest]
#[case::sequential(false)]
#[case::parallel(true)]
fn test_panic_in_one_item_becomes_item_failure(#[case] parallel: bool) {
    let store = Arc::new(PanicOnWrite {
        inner: MemoryModelStore::new(),
        poisoned: encode(&CanonicalKey::from_raw("material_Cement")),
    });
    let source = MemorySource::new()
        .with(
            ItemKind::Material,
            history(&[material("Steel"), material("Cement")], 36),
        )
        .with(ItemKind::Labor, history(&[labor("Mason")], 36));

    let report = pipeline(store.clone())
        .with_parallel(parallel)
        .run(&source)
        .unwrap();

    assert_eq!(report.succeeded, keys(&["material_Steel", "labor_Mason"]));
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].item.as_str(), "material_Cement");
    assert!(report.failed[0].error.contains("disk on fire"));
    assert_eq!(store.inner.len(), 2);
}
