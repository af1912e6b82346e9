//! # cost-forecast
//!
//! Command-line front end: train models, forecast items and serve JSON-line
//! requests over stdin/stdout.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use cost_forecast::api::{ApiError, ApiRequest, ApiResponse};
use cost_forecast::data::{CsvSource, ItemKind};
use cost_forecast::error::{ForecastError, Result};
use cost_forecast::models::ArimaModel;
use cost_forecast::sample::{default_items, generate_history, SampleItem};
use cost_forecast::{
    ForecastApi, ForecastRequest, ForecastService, FsModelStore, ModelRegistry, ModelStore,
    ServiceConfig, TrainingPipeline,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "cost-forecast")]
#[command(about = "Material and labor cost forecasting", long_about = None)]
struct Cli {
    /// JSON config file (environment variables still apply on top)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding model artifacts
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Directory holding the history CSV tables
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit one model per item and reload the registry
    Train {
        /// Fit items in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Forecast one item
    Predict {
        /// Item name, bare or kind-qualified
        name: String,

        /// Item kind (material or labor)
        #[arg(short, long)]
        kind: Option<String>,

        /// Number of periods to forecast
        #[arg(short, long)]
        steps: Option<i64>,
    },

    /// List loaded model keys
    Keys,

    /// Write synthetic history tables into the data directory
    Sample {
        /// Months of history per item
        #[arg(long, default_value = "48")]
        months: u32,

        /// First month of history (YYYY-MM-DD)
        #[arg(long, default_value = "2020-01-01")]
        start: String,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Answer JSON-line requests from stdin until EOF
    Serve,
}

fn load_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_json_file(path)?.merge_env()?,
        None => ServiceConfig::from_env()?,
    };
    if let Some(dir) = &cli.model_dir {
        config.model_dir = dir.clone();
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn build_api(config: &ServiceConfig) -> Result<ForecastApi> {
    let store: Arc<dyn ModelStore> = Arc::new(FsModelStore::with_extension(
        &config.model_dir,
        &config.artifact_extension,
    ));
    let registry = Arc::new(ModelRegistry::load(store.clone())?);

    let mut pipeline = TrainingPipeline::new(store, ArimaModel::from_order(config.arima))
        .with_parallel(config.parallel_training);
    if let Some(min) = config.min_observations {
        pipeline = pipeline.with_min_observations(min);
    }

    Ok(ForecastApi::new(
        ForecastService::new(registry),
        pipeline,
        Box::new(CsvSource::new(&config.data_dir)),
    ))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_sample(config: &ServiceConfig, months: u32, start: &str, seed: u64) -> Result<()> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .map_err(|e| ForecastError::InvalidArgument(format!("start '{}': {}", start, e)))?;
    let items = default_items();
    let source = CsvSource::new(&config.data_dir);

    for kind in ItemKind::ALL {
        let of_kind: Vec<SampleItem> = items.iter().filter(|i| i.kind == kind).cloned().collect();
        let observations = generate_history(&of_kind, start, months, seed)?;
        source.write(kind, &observations)?;
        info!(kind = %kind, items = of_kind.len(), path = %source.table_path(kind).display(), "wrote sample history");
    }
    Ok(())
}

fn serve(api: &ForecastApi) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<ApiRequest>(&line) {
            Ok(request) => api.handle(&request),
            Err(e) => ApiResponse::Error {
                error: ApiError::from(ForecastError::InvalidArgument(format!(
                    "malformed request: {}",
                    e
                ))),
            },
        };
        serde_json::to_writer(&mut stdout, &response)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
    }
    Ok(())
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Train { parallel } => {
            config.parallel_training |= parallel;
            let response = build_api(&config)?.handle_train();
            print_json(&response)?;
            if !response.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Predict { name, kind, steps } => {
            let api = build_api(&config)?;
            let request = ForecastRequest::new(kind.as_deref(), &name, steps);
            match api.handle_forecast(&request) {
                Ok(response) => print_json(&response)?,
                Err(error) => {
                    print_json(&ApiResponse::Error { error })?;
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Keys => {
            for key in build_api(&config)?.keys() {
                println!("{}", key);
            }
        }
        Commands::Sample {
            months,
            start,
            seed,
        } => write_sample(&config, months, &start, seed)?,
        Commands::Serve => {
            let api = build_api(&config)?;
            info!(models = api.service().registry().len(), "serving JSON-line requests on stdin");
            serve(&api)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cost_forecast=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}
