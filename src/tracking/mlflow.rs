//! MLflow Client: REST API 2.0 backend for tracking and registry.

use async_trait::async_trait;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::{ExperimentTracker, ModelRegistry, ModelVersion, RunInfo, RunStatus, TrackingError};

/// HTTP client for an MLflow tracking server.
#[derive(Clone)]
pub struct MlflowClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ExperimentEnvelope {
    experiment: Experiment,
}

#[derive(Deserialize)]
struct Experiment {
    experiment_id: String,
}

#[derive(Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Deserialize)]
struct RunEnvelope {
    run: Run,
}

#[derive(Deserialize)]
struct Run {
    info: RunInfo,
}

#[derive(Deserialize)]
struct SearchRunsResponse {
    #[serde(default)]
    runs: Vec<Run>,
}

#[derive(Deserialize)]
struct ModelVersionEnvelope {
    model_version: ModelVersion,
}

#[derive(Serialize)]
struct MetricEntry<'a> {
    key: &'a str,
    value: f64,
    timestamp: i64,
    step: i64,
}

#[derive(Serialize)]
struct ParamEntry<'a> {
    key: &'a str,
    value: &'a str,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Path below the artifact proxy for an `mlflow-artifacts:` URI.
///
/// `mlflow-artifacts:/1/abc/artifacts` and
/// `mlflow-artifacts://host:5000/1/abc/artifacts` both map to `1/abc/artifacts`.
fn proxy_artifact_path(uri: &str) -> Option<String> {
    let rest = uri.strip_prefix("mlflow-artifacts:")?;
    let path = match rest.strip_prefix("//") {
        Some(with_authority) => with_authority.find('/').map_or("", |i| &with_authority[i..]),
        None => rest,
    };
    Some(path.trim_matches('/').to_string())
}

/// Local directory for a `file://` URI or a bare filesystem path.
fn local_artifact_root(uri: &str) -> Option<PathBuf> {
    if let Some(path) = uri.strip_prefix("file://") {
        return Some(PathBuf::from(path));
    }
    if uri.contains("://") || uri.starts_with("mlflow-artifacts:") {
        return None;
    }
    Some(PathBuf::from(uri))
}

impl MlflowClient {
    /// Create a client for the server at `tracking_uri`.
    pub fn new(tracking_uri: &str, timeout: Duration) -> Result<Self, TrackingError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: tracking_uri.trim_end_matches('/').to_string(),
        })
    }

    /// Get tracking server URL for logging
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/2.0/mlflow/{}", self.base_url, path)
    }

    async fn ensure_success(
        path: &str,
        resp: reqwest::Response,
    ) -> Result<reqwest::Response, TrackingError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(TrackingError::Server {
            endpoint: path.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, TrackingError> {
        debug!(endpoint = path, "MLflow POST");
        let resp = self.http.post(self.endpoint(path)).json(body).send().await?;
        let resp = Self::ensure_success(path, resp).await?;
        Ok(resp.json().await?)
    }

    /// GET that maps 404 to `None`.
    async fn get_opt<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<R>, TrackingError> {
        debug!(endpoint = path, "MLflow GET");
        let resp = self.http.get(self.endpoint(path)).query(query).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = Self::ensure_success(path, resp).await?;
        Ok(Some(resp.json().await?))
    }
}

#[async_trait]
impl ExperimentTracker for MlflowClient {
    async fn find_experiment(&self, name: &str) -> Result<Option<String>, TrackingError> {
        let found: Option<ExperimentEnvelope> = self
            .get_opt("experiments/get-by-name", &[("experiment_name", name)])
            .await?;
        Ok(found.map(|e| e.experiment.experiment_id))
    }

    async fn create_experiment(&self, name: &str) -> Result<String, TrackingError> {
        let created: CreateExperimentResponse = self
            .post("experiments/create", &json!({ "name": name }))
            .await?;
        Ok(created.experiment_id)
    }

    async fn create_run(&self, experiment_id: &str) -> Result<RunInfo, TrackingError> {
        let created: RunEnvelope = self
            .post(
                "runs/create",
                &json!({ "experiment_id": experiment_id, "start_time": now_millis() }),
            )
            .await?;
        Ok(created.run.info)
    }

    async fn log_params(&self, run_id: &str, params: &[(String, String)]) -> Result<(), TrackingError> {
        let params: Vec<ParamEntry<'_>> = params
            .iter()
            .map(|(k, v)| ParamEntry { key: k, value: v })
            .collect();
        let _: IgnoredAny = self
            .post("runs/log-batch", &json!({ "run_id": run_id, "params": params }))
            .await?;
        Ok(())
    }

    async fn log_metrics(&self, run_id: &str, metrics: &[(String, f64)]) -> Result<(), TrackingError> {
        let timestamp = now_millis();
        let metrics: Vec<MetricEntry<'_>> = metrics
            .iter()
            .map(|(k, v)| MetricEntry {
                key: k,
                value: *v,
                timestamp,
                step: 0,
            })
            .collect();
        let _: IgnoredAny = self
            .post("runs/log-batch", &json!({ "run_id": run_id, "metrics": metrics }))
            .await?;
        Ok(())
    }

    async fn log_artifact(
        &self,
        run: &RunInfo,
        local_file: &Path,
        artifact_path: &str,
    ) -> Result<(), TrackingError> {
        let file_name = local_file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TrackingError::Backend(format!("invalid artifact file {}", local_file.display())))?;

        if let Some(proxy_path) = proxy_artifact_path(&run.artifact_uri) {
            let url = format!(
                "{}/api/2.0/mlflow-artifacts/artifacts/{}/{}/{}",
                self.base_url, proxy_path, artifact_path, file_name
            );
            let bytes = tokio::fs::read(local_file).await?;
            debug!(url = %url, bytes = bytes.len(), "Uploading artifact");
            let resp = self.http.put(&url).body(bytes).send().await?;
            Self::ensure_success("mlflow-artifacts", resp).await?;
            return Ok(());
        }

        if let Some(root) = local_artifact_root(&run.artifact_uri) {
            let dest_dir = root.join(artifact_path);
            tokio::fs::create_dir_all(&dest_dir).await?;
            tokio::fs::copy(local_file, dest_dir.join(file_name)).await?;
            return Ok(());
        }

        Err(TrackingError::UnsupportedArtifactUri(run.artifact_uri.clone()))
    }

    async fn end_run(&self, run_id: &str, status: RunStatus) -> Result<(), TrackingError> {
        let _: IgnoredAny = self
            .post(
                "runs/update",
                &json!({ "run_id": run_id, "status": status.as_str(), "end_time": now_millis() }),
            )
            .await?;
        Ok(())
    }

    async fn latest_run(&self, experiment_id: &str) -> Result<Option<RunInfo>, TrackingError> {
        let found: SearchRunsResponse = self
            .post(
                "runs/search",
                &json!({
                    "experiment_ids": [experiment_id],
                    "order_by": ["attributes.start_time DESC"],
                    "max_results": 1,
                }),
            )
            .await?;
        Ok(found.runs.into_iter().next().map(|r| r.info))
    }

    fn backend_name(&self) -> &'static str {
        "mlflow"
    }
}

#[async_trait]
impl ModelRegistry for MlflowClient {
    async fn registered_model_exists(&self, name: &str) -> Result<bool, TrackingError> {
        let found: Option<IgnoredAny> = self
            .get_opt("registered-models/get", &[("name", name)])
            .await?;
        Ok(found.is_some())
    }

    async fn create_registered_model(&self, name: &str) -> Result<(), TrackingError> {
        let _: IgnoredAny = self
            .post("registered-models/create", &json!({ "name": name }))
            .await?;
        Ok(())
    }

    async fn create_model_version(
        &self,
        name: &str,
        source: &str,
        run_id: &str,
    ) -> Result<ModelVersion, TrackingError> {
        let created: ModelVersionEnvelope = self
            .post(
                "model-versions/create",
                &json!({ "name": name, "source": source, "run_id": run_id }),
            )
            .await?;
        Ok(created.model_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_path_without_authority() {
        assert_eq!(
            proxy_artifact_path("mlflow-artifacts:/1/abc/artifacts").as_deref(),
            Some("1/abc/artifacts")
        );
    }

    #[test]
    fn test_proxy_path_with_authority() {
        assert_eq!(
            proxy_artifact_path("mlflow-artifacts://mlflow:5000/7/run/artifacts").as_deref(),
            Some("7/run/artifacts")
        );
        assert!(proxy_artifact_path("file:///tmp/x").is_none());
    }

    #[test]
    fn test_local_roots() {
        assert_eq!(
            local_artifact_root("file:///mlruns/1/r/artifacts"),
            Some(PathBuf::from("/mlruns/1/r/artifacts"))
        );
        assert_eq!(local_artifact_root("./mlruns/1"), Some(PathBuf::from("./mlruns/1")));
        assert!(local_artifact_root("s3://bucket/key").is_none());
        assert!(local_artifact_root("mlflow-artifacts:/1/r").is_none());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = MlflowClient::new("http://localhost:5000/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint("runs/create"),
            "http://localhost:5000/api/2.0/mlflow/runs/create"
        );
    }

    #[tokio::test]
    async fn test_local_artifact_copy() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("model.json");
        std::fs::write(&src, b"{}").unwrap();
        let root = dir.path().join("runs/1/artifacts");

        let client = MlflowClient::new("http://localhost:5000", Duration::from_secs(1)).unwrap();
        let run = RunInfo {
            run_id: "r".into(),
            experiment_id: "1".into(),
            start_time: 0,
            artifact_uri: format!("file://{}", root.display()),
        };
        client.log_artifact(&run, &src, "model").await.unwrap();
        assert!(root.join("model/model.json").exists());
    }
}
