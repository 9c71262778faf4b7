//! Experiment tracking and model registry
//!
//! Two traits abstract the tracking server so pipeline code never touches
//! HTTP directly:
//! - `ExperimentTracker`: experiments, runs, params/metrics, artifacts
//! - `ModelRegistry`: registered models and their versions
//!
//! Backends:
//! - `MlflowClient`: MLflow REST API 2.0
//! - `InMemoryTracking`: process-local store for tests and offline runs

mod memory;
mod mlflow;

pub use memory::InMemoryTracking;
pub use mlflow::MlflowClient;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Tracking and registry errors
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{endpoint} returned status {status}: {body}")]
    Server {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported artifact location '{0}'")]
    UnsupportedArtifactUri(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("tracking backend error: {0}")]
    Backend(String),
}

/// Final state of a tracked run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
        }
    }
}

/// Identity and storage location of a tracked run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub experiment_id: String,
    /// Unix epoch milliseconds
    #[serde(deserialize_with = "lenient_i64")]
    pub start_time: i64,
    /// Root under which the run's artifacts are stored
    #[serde(default)]
    pub artifact_uri: String,
}

/// A version created in the model registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub run_id: String,
    #[serde(default)]
    pub source: String,
}

/// Accepts an integer encoded either as a JSON number or a string.
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(i64),
        Str(String),
    }
    match NumOrString::deserialize(deserializer)? {
        NumOrString::Num(n) => Ok(n),
        NumOrString::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Experiment/run logging backend.
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across async tasks.
#[async_trait]
pub trait ExperimentTracker: Send + Sync {
    /// Experiment id by name, `None` when it does not exist.
    async fn find_experiment(&self, name: &str) -> Result<Option<String>, TrackingError>;

    async fn create_experiment(&self, name: &str) -> Result<String, TrackingError>;

    async fn get_or_create_experiment(&self, name: &str) -> Result<String, TrackingError> {
        match self.find_experiment(name).await? {
            Some(id) => Ok(id),
            None => self.create_experiment(name).await,
        }
    }

    async fn create_run(&self, experiment_id: &str) -> Result<RunInfo, TrackingError>;

    async fn log_params(&self, run_id: &str, params: &[(String, String)]) -> Result<(), TrackingError>;

    async fn log_metrics(&self, run_id: &str, metrics: &[(String, f64)]) -> Result<(), TrackingError>;

    /// Store a local file under `artifact_path` inside the run's artifact root.
    async fn log_artifact(
        &self,
        run: &RunInfo,
        local_file: &Path,
        artifact_path: &str,
    ) -> Result<(), TrackingError>;

    async fn end_run(&self, run_id: &str, status: RunStatus) -> Result<(), TrackingError>;

    /// Most recently started run of an experiment.
    async fn latest_run(&self, experiment_id: &str) -> Result<Option<RunInfo>, TrackingError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Registered-model backend.
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    async fn registered_model_exists(&self, name: &str) -> Result<bool, TrackingError>;

    async fn create_registered_model(&self, name: &str) -> Result<(), TrackingError>;

    async fn create_model_version(
        &self,
        name: &str,
        source: &str,
        run_id: &str,
    ) -> Result<ModelVersion, TrackingError>;
}

/// Borrowed tracker + registry pair handed to the pipeline stages.
#[derive(Clone, Copy)]
pub struct TrackingHandle<'a> {
    pub tracker: &'a dyn ExperimentTracker,
    pub registry: &'a dyn ModelRegistry,
}

impl<'a> TrackingHandle<'a> {
    /// Use one backend for both roles.
    pub fn new<T: ExperimentTracker + ModelRegistry>(backend: &'a T) -> Self {
        Self {
            tracker: backend,
            registry: backend,
        }
    }
}
