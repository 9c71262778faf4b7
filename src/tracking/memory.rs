//! In-memory tracking backend for testing and offline runs.
//!
//! Thread-safe via `Mutex`. Not durable: data is lost on drop.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{ExperimentTracker, ModelRegistry, ModelVersion, RunInfo, RunStatus, TrackingError};

/// Everything recorded about one run.
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub info: RunInfo,
    pub status: RunStatus,
    pub params: Vec<(String, String)>,
    pub metrics: Vec<(String, f64)>,
    /// `(artifact_path, local file)` pairs
    pub artifacts: Vec<(String, PathBuf)>,
}

#[derive(Default)]
struct State {
    experiments: Vec<(String, String)>,
    runs: Vec<RecordedRun>,
    registered: HashMap<String, Vec<ModelVersion>>,
    clock: i64,
}

#[derive(Default)]
pub struct InMemoryTracking {
    state: Mutex<State>,
    fail_registry: bool,
}

impl InMemoryTracking {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose registry calls all fail.
    pub fn with_failing_registry() -> Self {
        Self {
            state: Mutex::default(),
            fail_registry: true,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, TrackingError> {
        self.state
            .lock()
            .map_err(|e| TrackingError::Backend(e.to_string()))
    }

    /// Snapshot of all runs, oldest first.
    pub fn runs(&self) -> Vec<RecordedRun> {
        self.state.lock().map(|s| s.runs.clone()).unwrap_or_default()
    }

    /// Versions registered under `name`.
    pub fn versions(&self, name: &str) -> Vec<ModelVersion> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.registered.get(name).cloned())
            .unwrap_or_default()
    }

    fn check_registry(&self) -> Result<(), TrackingError> {
        if self.fail_registry {
            return Err(TrackingError::Backend("registry unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ExperimentTracker for InMemoryTracking {
    async fn find_experiment(&self, name: &str) -> Result<Option<String>, TrackingError> {
        let state = self.lock()?;
        Ok(state
            .experiments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| id.clone()))
    }

    async fn create_experiment(&self, name: &str) -> Result<String, TrackingError> {
        let mut state = self.lock()?;
        let id = state.experiments.len().to_string();
        state.experiments.push((name.to_string(), id.clone()));
        Ok(id)
    }

    async fn create_run(&self, experiment_id: &str) -> Result<RunInfo, TrackingError> {
        let mut state = self.lock()?;
        if !state.experiments.iter().any(|(_, id)| id == experiment_id) {
            return Err(TrackingError::NotFound(format!("experiment {experiment_id}")));
        }
        state.clock += 1;
        let run_id = format!("run-{}", state.runs.len());
        let info = RunInfo {
            artifact_uri: format!("memory:/{experiment_id}/{run_id}/artifacts"),
            run_id,
            experiment_id: experiment_id.to_string(),
            start_time: state.clock,
        };
        state.runs.push(RecordedRun {
            info: info.clone(),
            status: RunStatus::Running,
            params: Vec::new(),
            metrics: Vec::new(),
            artifacts: Vec::new(),
        });
        Ok(info)
    }

    async fn log_params(&self, run_id: &str, params: &[(String, String)]) -> Result<(), TrackingError> {
        let mut state = self.lock()?;
        let run = find_run(&mut state, run_id)?;
        run.params.extend_from_slice(params);
        Ok(())
    }

    async fn log_metrics(&self, run_id: &str, metrics: &[(String, f64)]) -> Result<(), TrackingError> {
        let mut state = self.lock()?;
        let run = find_run(&mut state, run_id)?;
        run.metrics.extend_from_slice(metrics);
        Ok(())
    }

    async fn log_artifact(
        &self,
        run: &RunInfo,
        local_file: &Path,
        artifact_path: &str,
    ) -> Result<(), TrackingError> {
        if !local_file.exists() {
            return Err(TrackingError::NotFound(local_file.display().to_string()));
        }
        let mut state = self.lock()?;
        let recorded = find_run(&mut state, &run.run_id)?;
        recorded
            .artifacts
            .push((artifact_path.to_string(), local_file.to_path_buf()));
        Ok(())
    }

    async fn end_run(&self, run_id: &str, status: RunStatus) -> Result<(), TrackingError> {
        let mut state = self.lock()?;
        find_run(&mut state, run_id)?.status = status;
        Ok(())
    }

    async fn latest_run(&self, experiment_id: &str) -> Result<Option<RunInfo>, TrackingError> {
        let state = self.lock()?;
        Ok(state
            .runs
            .iter()
            .filter(|r| r.info.experiment_id == experiment_id)
            .max_by_key(|r| r.info.start_time)
            .map(|r| r.info.clone()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

fn find_run<'a>(state: &'a mut State, run_id: &str) -> Result<&'a mut RecordedRun, TrackingError> {
    state
        .runs
        .iter_mut()
        .find(|r| r.info.run_id == run_id)
        .ok_or_else(|| TrackingError::NotFound(format!("run {run_id}")))
}

#[async_trait]
impl ModelRegistry for InMemoryTracking {
    async fn registered_model_exists(&self, name: &str) -> Result<bool, TrackingError> {
        self.check_registry()?;
        Ok(self.lock()?.registered.contains_key(name))
    }

    async fn create_registered_model(&self, name: &str) -> Result<(), TrackingError> {
        self.check_registry()?;
        self.lock()?.registered.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn create_model_version(
        &self,
        name: &str,
        source: &str,
        run_id: &str,
    ) -> Result<ModelVersion, TrackingError> {
        self.check_registry()?;
        let mut state = self.lock()?;
        let versions = state
            .registered
            .get_mut(name)
            .ok_or_else(|| TrackingError::NotFound(format!("registered model {name}")))?;
        let version = ModelVersion {
            name: name.to_string(),
            version: (versions.len() + 1).to_string(),
            run_id: run_id.to_string(),
            source: source.to_string(),
        };
        versions.push(version.clone());
        Ok(version)
    }
}
