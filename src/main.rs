//! NPV Predictor command line
//!
//! # Usage
//!
//! ```bash
//! # Full training pipeline (preprocess, train, evaluate, register, report)
//! npv-predictor run
//!
//! # Single stages
//! npv-predictor preprocess
//! npv-predictor train --config params.toml
//!
//! # Prediction service and dashboard
//! npv-predictor serve --addr 0.0.0.0:8000
//! npv-predictor dashboard
//! ```
//!
//! # Environment Variables
//!
//! - `NPV_CONFIG`: Path to the TOML config (default: ./params.toml)
//! - `NPV_SERVER_ADDR`: Prediction service bind address
//! - `NPV_DASHBOARD_ADDR`: Dashboard bind address
//! - `NPV_CORS_ORIGINS`: Comma-separated allowed origins for the API
//! - `NPV_LOG_FORMAT`: Set to "json" for structured log output
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use npv_predictor::api::{create_app, ServiceState};
use npv_predictor::config::PipelineConfig;
use npv_predictor::dashboard::{create_dashboard_app, DashboardState};
use npv_predictor::pipeline::{self, evaluate, preprocess, register, report, train};
use npv_predictor::tracking::{ExperimentTracker, MlflowClient, TrackingHandle};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "npv-predictor")]
#[command(about = "Well NPV prediction: training pipeline, prediction service and dashboard")]
#[command(version)]
struct CliArgs {
    /// Path to the TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Encode the raw dataset and write the train/test split
    Preprocess,
    /// Train the model, cross-validate and log the run
    Train,
    /// Score the trained model on the held-out split
    Evaluate,
    /// Register the latest tracked run in the model registry
    Register,
    /// Assemble the model report from metrics and evaluation
    Report,
    /// Run every pipeline stage in order
    Run,
    /// Serve the prediction API
    Serve {
        /// Override the bind address (default: "0.0.0.0:8000")
        #[arg(short, long, env = "NPV_SERVER_ADDR")]
        addr: Option<String>,
    },
    /// Serve the dashboard UI
    Dashboard {
        /// Override the bind address (default: "0.0.0.0:8501")
        #[arg(short, long, env = "NPV_DASHBOARD_ADDR")]
        addr: Option<String>,
    },
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = json
        || std::env::var("NPV_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

/// MLflow client when tracking is enabled in the config.
fn tracking_client(config: &PipelineConfig) -> Result<Option<MlflowClient>> {
    if !config.tracking.enabled {
        info!("Experiment tracking disabled");
        return Ok(None);
    }
    let client = MlflowClient::new(
        &config.tracking.uri,
        Duration::from_secs(config.tracking.timeout_secs),
    )
    .context("Failed to create MLflow client")?;
    info!(uri = %client.base_url(), "Experiment tracking enabled");
    Ok(Some(client))
}

/// Serve `app` on `addr` until the token is cancelled.
async fn serve(
    app: axum::Router,
    addr: &str,
    name: &'static str,
    cancel_token: CancellationToken,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {} on {}", name, addr))?;
    info!("[{}] Listening on http://{}", name, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
            info!("[{}] Received shutdown signal", name);
        })
        .await
        .map_err(|e| {
            error!("[{}] Server error: {}", name, e);
            anyhow::anyhow!("{} server error: {}", name, e)
        })?;

    info!("[{}] Graceful shutdown complete", name);
    Ok(())
}

fn shutdown_token() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });
    cancel_token
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let config = PipelineConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        SubCommand::Preprocess => {
            let summary = preprocess::run(&config)?;
            info!(
                train = summary.n_train,
                test = summary.n_test,
                features = summary.n_features,
                "Preprocessing complete"
            );
        }
        SubCommand::Train => {
            let client = tracking_client(&config)?;
            let doc = train::run(&config, client.as_ref().map(|c| c as &dyn ExperimentTracker)).await?;
            info!(cv_mean = doc.cv_mean, cv_std = doc.cv_std, "Training complete");
        }
        SubCommand::Evaluate => {
            let doc = evaluate::run(&config)?;
            info!(r2 = doc.test_metrics.r2, mae = doc.test_metrics.mae, "Evaluation complete");
        }
        SubCommand::Register => {
            let client = tracking_client(&config)?;
            let record = register::run(&config, client.as_ref().map(TrackingHandle::new)).await?;
            if record.version.is_none() {
                warn!(status = ?record.status, "No model version registered");
            }
        }
        SubCommand::Report => {
            report::run(&config)?;
            info!(path = %config.artifacts.report_path.display(), "Report written");
        }
        SubCommand::Run => {
            let client = tracking_client(&config)?;
            pipeline::run_all(&config, client.as_ref().map(TrackingHandle::new)).await?;
        }
        SubCommand::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.server.addr.clone());
            let state = ServiceState::from_artifacts(&config.artifacts);
            if !state.model_loaded() {
                warn!("Serving without a model; /predict will answer 503 until artifacts exist and the service restarts");
            }
            serve(create_app(state), &addr, "API", shutdown_token()).await?;
        }
        SubCommand::Dashboard { addr } => {
            let addr = addr.unwrap_or_else(|| config.dashboard.addr.clone());
            let state = DashboardState::from_config(&config, args.config.clone())
                .context("Failed to create prediction client")?;
            info!(api_url = %state.client.base_url(), "Dashboard backed by prediction service");
            serve(create_dashboard_app(state), &addr, "Dashboard", shutdown_token()).await?;
        }
    }

    Ok(())
}
