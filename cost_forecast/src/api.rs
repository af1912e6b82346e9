//! Request and response types for the forecast and train operations
//!
//! Transport-agnostic: the `serve` command feeds these from JSON lines, and an
//! HTTP layer could feed them from query strings. Failures carry an
//! [`ErrorCategory`] so a transport can map them to its own status codes.

use crate::codec::CanonicalKey;
use crate::data::HistoricalSource;
use crate::error::{ErrorCategory, ForecastError};
use crate::registry::ReloadSummary;
use crate::resolver::normalize;
use crate::service::{parse_steps, ForecastService};
use crate::training::{ItemFailure, TrainingPipeline};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Horizon as received: a JSON number or a query-string value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepsParam {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl StepsParam {
    fn as_text(&self) -> String {
        match self {
            StepsParam::Integer(n) => n.to_string(),
            StepsParam::Float(x) => x.to_string(),
            StepsParam::Text(s) => s.clone(),
        }
    }
}

/// Forecast request for one item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    /// `material` or `labor`
    #[serde(default)]
    pub kind: Option<String>,
    /// Item name, bare or kind-qualified
    #[serde(default)]
    pub name: Option<String>,
    /// Periods to forecast, 1 when absent
    #[serde(default)]
    pub steps: Option<StepsParam>,
}

impl ForecastRequest {
    pub fn new(kind: Option<&str>, name: &str, steps: Option<i64>) -> Self {
        Self {
            kind: kind.map(str::to_string),
            name: Some(name.to_string()),
            steps: steps.map(StepsParam::Integer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub kind: Option<String>,
    #[serde(rename = "resolvedName")]
    pub resolved_name: CanonicalKey,
    pub forecast: Vec<f64>,
}

/// Structured failure returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub category: ErrorCategory,
    pub message: String,
}

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        Self {
            category: err.category(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

/// Outcome of a train request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TrainResponse {
    Success {
        message: String,
        succeeded: Vec<CanonicalKey>,
        failed: Vec<ItemFailure>,
    },
    Error {
        message: String,
    },
}

impl TrainResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, TrainResponse::Success { .. })
    }
}

/// One request line of the `serve` loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ApiRequest {
    Forecast(ForecastRequest),
    Train,
    Keys,
}

/// One response line of the `serve` loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse {
    Forecast(ForecastResponse),
    Train(TrainResponse),
    Keys { keys: Vec<CanonicalKey> },
    Error { error: ApiError },
}

/// Forecast and train operations over one registry
pub struct ForecastApi {
    service: ForecastService,
    pipeline: TrainingPipeline,
    source: Box<dyn HistoricalSource + Send + Sync>,
}

impl ForecastApi {
    pub fn new(
        service: ForecastService,
        pipeline: TrainingPipeline,
        source: Box<dyn HistoricalSource + Send + Sync>,
    ) -> Self {
        Self {
            service,
            pipeline,
            source,
        }
    }

    pub fn service(&self) -> &ForecastService {
        &self.service
    }

    /// Answer a forecast request, all or nothing
    pub fn handle_forecast(
        &self,
        request: &ForecastRequest,
    ) -> std::result::Result<ForecastResponse, ApiError> {
        let name = request
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ForecastError::MissingParameter("name".to_string()))?;
        let kind = request.kind.as_deref().filter(|k| !k.trim().is_empty());
        let steps = parse_steps(request.steps.as_ref().map(StepsParam::as_text).as_deref())?;

        let key = self.service.resolve(kind, Some(name))?;
        let forecast = self.service.predict(&key, Some(steps as i64))?;

        let kind = key
            .kind()
            .map(|k| k.to_string())
            .or_else(|| kind.map(normalize));
        Ok(ForecastResponse {
            kind,
            resolved_name: key,
            forecast,
        })
    }

    /// Run training, then reload the registry if the run got past setup
    pub fn handle_train(&self) -> TrainResponse {
        let report = match self.pipeline.run(self.source.as_ref()) {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "training run failed");
                return TrainResponse::Error {
                    message: format!("Error in training process: {}", e),
                };
            }
        };

        let message = match self.service.registry().reload() {
            Ok(ReloadSummary { loaded, .. }) => {
                info!(loaded, "registry reloaded after training");
                "Models trained successfully".to_string()
            }
            Err(e) => {
                warn!(error = %e, "registry reload after training failed");
                format!("Models trained; registry reload failed: {}", e)
            }
        };

        TrainResponse::Success {
            message,
            succeeded: report.succeeded,
            failed: report.failed,
        }
    }

    /// Loaded keys, sorted
    pub fn keys(&self) -> Vec<CanonicalKey> {
        let mut keys: Vec<CanonicalKey> = self.service.registry().keys().into_iter().collect();
        keys.sort();
        keys
    }

    /// Dispatch one request
    pub fn handle(&self, request: &ApiRequest) -> ApiResponse {
        match request {
            ApiRequest::Forecast(req) => match self.handle_forecast(req) {
                Ok(response) => ApiResponse::Forecast(response),
                Err(error) => ApiResponse::Error { error },
            },
            ApiRequest::Train => ApiResponse::Train(self.handle_train()),
            ApiRequest::Keys => ApiResponse::Keys { keys: self.keys() },
        }
    }
}

impl std::fmt::Debug for ForecastApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForecastApi")
            .field("service", &self.service)
            .field("pipeline", &self.pipeline)
            .field("source", &self.source.describe())
            .finish()
    }
}
