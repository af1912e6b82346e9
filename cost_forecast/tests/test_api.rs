mod common;

use common::{history, labor, material, save_incompatible, UnreachableSource};
use cost_forecast::api::{
    ApiRequest, ApiResponse, ForecastApi, ForecastRequest, StepsParam, TrainResponse,
};
use cost_forecast::data::{HistoricalSource, ItemKind, MemorySource};
use cost_forecast::error::ErrorCategory;
use cost_forecast::models::ArimaModel;
use cost_forecast::registry::ModelRegistry;
use cost_forecast::service::ForecastService;
use cost_forecast::store::{MemoryModelStore, ModelStore};
use cost_forecast::training::TrainingPipeline;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;

fn api_with(store: Arc<MemoryModelStore>, source: Box<dyn HistoricalSource + Send + Sync>) -> ForecastApi {
    let shared: Arc<dyn ModelStore> = store;
    let registry = Arc::new(ModelRegistry::load(shared.clone()).unwrap());
    ForecastApi::new(
        ForecastService::new(registry),
        TrainingPipeline::new(shared, ArimaModel::new(2, 1, 2).unwrap()),
        source,
    )
}

fn sample_source() -> MemorySource {
    MemorySource::new()
        .with(
            ItemKind::Material,
            history(&[material("Steel"), material("Copper Wire")], 36),
        )
        .with(ItemKind::Labor, history(&[labor("Mason")], 36))
}

/// Trained api over the sample source
fn trained_api() -> ForecastApi {
    let api = api_with(Arc::new(MemoryModelStore::new()), Box::new(sample_source()));
    assert!(api.handle_train().is_success());
    api
}

#[test]
fn test_train_reloads_registry() {
    let api = api_with(Arc::new(MemoryModelStore::new()), Box::new(sample_source()));
    assert!(api.keys().is_empty());

    match api.handle_train() {
        TrainResponse::Success {
            succeeded, failed, ..
        } => {
            assert_eq!(succeeded.len(), 3);
            assert!(failed.is_empty());
        }
        other => panic!("expected success, got {:?}", other),
    }

    let keys: Vec<String> = api.keys().iter().map(|k| k.to_string()).collect();
    assert_eq!(
        keys,
        vec!["labor_Mason", "material_Copper Wire", "material_Steel"]
    );
}

#[test]
fn test_train_failure_keeps_registry() {
    let store = Arc::new(MemoryModelStore::new());
    common::save_model(store.as_ref(), "material_steel", 1);
    let api = api_with(store, Box::new(UnreachableSource));

    let response = api.handle_train();
    assert!(!response.is_success());
    assert_eq!(api.keys().len(), 1);

    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("connection refused"));
}

#[test]
fn test_train_response_shape() {
    let response = trained_api().handle_train();
    let body = serde_json::to_value(&response).unwrap();

    assert_eq!(body["status"], "success");
    assert_eq!(body["succeeded"].as_array().unwrap().len(), 3);
    assert_eq!(body["failed"], json!([]));
}

#[rstest]
#[case(Some("material"), "steel", "material_Steel", "material")]
#[case(None, "Copper wire", "material_Copper Wire", "material")]
#[case(Some("LABOR"), " mason ", "labor_Mason", "labor")]
#[case(None, "labor_mason", "labor_Mason", "labor")]
fn test_forecast_resolves_names(
    #[case] kind: Option<&str>,
    #[case] name: &str,
    #[case] resolved: &str,
    #[case] reported_kind: &str,
) {
    let api = trained_api();
    let response = api
        .handle_forecast(&ForecastRequest::new(kind, name, Some(3)))
        .unwrap();

    assert_eq!(response.resolved_name.as_str(), resolved);
    assert_eq!(response.kind.as_deref(), Some(reported_kind));
    assert_eq!(response.forecast.len(), 3);
}

#[test]
fn test_forecast_response_shape() {
    let api = trained_api();
    let response = api
        .handle_forecast(&ForecastRequest::new(Some("material"), "Steel", None))
        .unwrap();
    let body = serde_json::to_value(&response).unwrap();

    assert_eq!(body["kind"], "material");
    assert_eq!(body["resolvedName"], "material_Steel");
    assert_eq!(body["forecast"].as_array().unwrap().len(), 1);
}

#[rstest]
#[case::missing_name(json!({"kind": "material"}), ErrorCategory::MissingParameter)]
#[case::blank_name(json!({"kind": "material", "name": "  "}), ErrorCategory::MissingParameter)]
#[case::unknown_item(json!({"kind": "material", "name": "Gold"}), ErrorCategory::NotFound)]
#[case::zero_steps(json!({"name": "Steel", "steps": 0}), ErrorCategory::InvalidArgument)]
#[case::negative_steps(json!({"name": "Steel", "steps": "-3"}), ErrorCategory::InvalidArgument)]
#[case::text_steps(json!({"name": "Steel", "steps": "many"}), ErrorCategory::InvalidArgument)]
#[case::huge_steps(json!({"name": "Steel", "steps": 9223372036854775807_i64}), ErrorCategory::InvalidArgument)]
#[case::fractional_steps(json!({"name": "Steel", "steps": 2.5}), ErrorCategory::InvalidArgument)]
fn test_forecast_errors(#[case] request: serde_json::Value, #[case] category: ErrorCategory) {
    let api = trained_api();
    let request: ForecastRequest = serde_json::from_value(request).unwrap();

    let err = api.handle_forecast(&request).unwrap_err();
    assert_eq!(err.category, category);
}

#[test]
fn test_steps_accepts_text_and_numbers() {
    let request: ForecastRequest =
        serde_json::from_value(json!({"name": "Steel", "steps": "4"})).unwrap();
    assert_eq!(request.steps, Some(StepsParam::Text("4".to_string())));

    let api = trained_api();
    assert_eq!(api.handle_forecast(&request).unwrap().forecast.len(), 4);
}

#[test]
fn test_broken_model_reports_prediction_error() {
    let store = Arc::new(MemoryModelStore::new());
    save_incompatible(store.as_ref(), "material_broken");
    let api = api_with(store, Box::new(MemorySource::new()));

    let err = api
        .handle_forecast(&ForecastRequest::new(None, "broken", Some(2)))
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::PredictionError);

    let body = serde_json::to_value(&ApiResponse::Error { error: err }).unwrap();
    assert_eq!(body["error"]["category"], "prediction-error");
}

#[test]
fn test_dispatch_json_requests() {
    let api = trained_api();

    let request: ApiRequest = serde_json::from_str(r#"{"op":"keys"}"#).unwrap();
    match api.handle(&request) {
        ApiResponse::Keys { keys } => assert_eq!(keys.len(), 3),
        other => panic!("unexpected response {:?}", other),
    }

    let request: ApiRequest =
        serde_json::from_str(r#"{"op":"forecast","kind":"labor","name":"Mason","steps":2}"#)
            .unwrap();
    let body = serde_json::to_value(api.handle(&request)).unwrap();
    assert_eq!(body["resolvedName"], "labor_Mason");
    assert_eq!(body["forecast"].as_array().unwrap().len(), 2);

    let request: ApiRequest = serde_json::from_str(r#"{"op":"forecast","name":"nope"}"#).unwrap();
    let body = serde_json::to_value(api.handle(&request)).unwrap();
    assert_eq!(body["error"]["category"], "not-found");
}
