//! HTTP client for the prediction service, used by the dashboard.

use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::types::WellInput;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Connection(#[from] reqwest::Error),
    #[error("API error {status}: {detail}")]
    Api { status: u16, detail: String },
}

/// `/model_info` payload when a model is loaded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteModelInfo {
    pub model_type: String,
    pub n_features: usize,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Deserialize)]
struct PredictionBody {
    #[serde(rename = "predicted_NPV")]
    predicted_npv: f64,
}

#[derive(Deserialize)]
struct DetailBody {
    detail: String,
}

#[derive(Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
    base_url: String,
    predict_timeout: Duration,
    status_timeout: Duration,
}

impl PredictionClient {
    pub fn new(
        base_url: &str,
        predict_timeout: Duration,
        status_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            predict_timeout,
            status_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// True when `/health` answers 200 within the status timeout.
    pub async fn health(&self) -> bool {
        match self
            .http
            .get(format!("{}/health", self.base_url))
            .timeout(self.status_timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Health check failed");
                false
            }
        }
    }

    /// Model description, `None` when unreachable or no model is loaded.
    pub async fn model_info(&self) -> Option<RemoteModelInfo> {
        let resp = self
            .http
            .get(format!("{}/model_info", self.base_url))
            .timeout(self.status_timeout)
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            return None;
        }
        resp.json().await.ok()
    }

    pub async fn predict(&self, input: &WellInput) -> Result<f64, ClientError> {
        let resp = self
            .http
            .post(format!("{}/predict", self.base_url))
            .timeout(self.predict_timeout)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let body: PredictionBody = resp.json().await?;
            return Ok(body.predicted_npv);
        }

        let text = resp.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<DetailBody>(&text)
            .map(|b| b.detail)
            .unwrap_or(text);
        Err(ClientError::Api {
            status: status.as_u16(),
            detail,
        })
    }
}
