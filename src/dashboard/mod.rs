//! Dashboard UI
//!
//! Server-rendered pages for entering well parameters and viewing
//! predictions. Talks to the prediction service over HTTP and reads local
//! pipeline outputs (metrics, evaluation, config) straight from disk.

pub mod client;
pub mod handlers;
pub mod history;
pub mod views;

pub use client::{ClientError, PredictionClient, RemoteModelInfo};
pub use history::{HistoryEntry, PredictionHistory};

use axum::routing::{get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::config::{ArtifactConfig, PipelineConfig};

/// Shared state for dashboard handlers
#[derive(Clone)]
pub struct DashboardState {
    pub client: PredictionClient,
    pub history: PredictionHistory,
    pub artifacts: Arc<ArtifactConfig>,
    pub trajectory_types: Arc<[String]>,
    /// Config file shown in the sidebar, if one was loaded
    pub config_path: Option<PathBuf>,
}

impl DashboardState {
    pub fn from_config(config: &PipelineConfig, config_path: Option<PathBuf>) -> Result<Self, ClientError> {
        let d = &config.dashboard;
        let client = PredictionClient::new(
            &d.api_url,
            Duration::from_secs(d.predict_timeout_secs),
            Duration::from_secs(d.status_timeout_secs),
        )?;
        Ok(Self {
            client,
            history: PredictionHistory::new(d.history_limit),
            artifacts: Arc::new(config.artifacts.clone()),
            trajectory_types: d.trajectory_types.clone().into(),
            config_path,
        })
    }
}

/// Create the dashboard router.
pub fn create_dashboard_app(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/predict", post(handlers::predict))
        .route("/history", get(handlers::history))
        .route("/history/clear", post(handlers::clear_history))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
