//! API route handlers
//!
//! - `/` and `/health`: liveness and model availability
//! - `/model_info`: loaded model description
//! - `/predict`: single-well NPV prediction

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::envelope::ApiError;
use crate::config::ArtifactConfig;
use crate::inference::InferenceContext;
use crate::types::WellInput;

// ============================================================================
// API State
// ============================================================================

/// Model availability, fixed at startup.
#[derive(Clone)]
pub enum ModelState {
    Loaded(Arc<InferenceContext>),
    Unloaded { reason: Arc<str> },
}

/// Shared state for API handlers
#[derive(Clone)]
pub struct ServiceState {
    pub model: ModelState,
}

impl ServiceState {
    pub fn loaded(context: InferenceContext) -> Self {
        Self {
            model: ModelState::Loaded(Arc::new(context)),
        }
    }

    pub fn unloaded(reason: impl Into<String>) -> Self {
        Self {
            model: ModelState::Unloaded {
                reason: Arc::from(reason.into()),
            },
        }
    }

    /// Load artifacts; any failure leaves the service running without a model.
    pub fn from_artifacts(artifacts: &ArtifactConfig) -> Self {
        match InferenceContext::load(artifacts) {
            Ok(context) => {
                info!(
                    kind = context.model_kind().as_str(),
                    features = context.feature_columns().len(),
                    "Model loaded"
                );
                Self::loaded(context)
            }
            Err(e) => {
                warn!(error = %e, "Model not loaded, /predict will return 503");
                Self::unloaded(e.to_string())
            }
        }
    }

    pub fn model_loaded(&self) -> bool {
        matches!(self.model, ModelState::Loaded(_))
    }
}

// ============================================================================
// Liveness
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub status: &'static str,
    pub model_loaded: bool,
}

/// GET / - service banner
pub async fn root(State(state): State<ServiceState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "NPV Prediction API",
        status: "active",
        model_loaded: state.model_loaded(),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
}

/// GET /health
pub async fn health(State(state): State<ServiceState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        model_loaded: state.model_loaded(),
    })
}

// ============================================================================
// Model Info
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ModelInfoResponse {
    Info {
        model_type: &'static str,
        n_features: usize,
        features: Vec<String>,
    },
    Unavailable {
        error: String,
    },
}

/// GET /model_info - always 200; `{error}` when no model is loaded
pub async fn model_info(State(state): State<ServiceState>) -> Json<ModelInfoResponse> {
    Json(match &state.model {
        ModelState::Loaded(ctx) => ModelInfoResponse::Info {
            model_type: ctx.model_kind().as_str(),
            n_features: ctx.feature_columns().len(),
            features: ctx.feature_columns().to_vec(),
        },
        ModelState::Unloaded { .. } => ModelInfoResponse::Unavailable {
            error: "Model not loaded".to_string(),
        },
    })
}

// ============================================================================
// Prediction
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    #[serde(rename = "predicted_NPV")]
    pub predicted_npv: f64,
    pub status: &'static str,
}

/// POST /predict
///
/// Input is validated before the model is consulted, so a bad request gets
/// 422 even when no model is loaded.
pub async fn predict(
    State(state): State<ServiceState>,
    payload: Result<Json<WellInput>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(input) = payload.map_err(|rejection| ApiError::unprocessable(rejection.body_text()))?;

    let violations = input.validate();
    if !violations.is_empty() {
        return Err(ApiError::unprocessable(violations.join("; ")));
    }

    let ctx = match &state.model {
        ModelState::Loaded(ctx) => ctx,
        ModelState::Unloaded { reason } => {
            warn!(reason = %reason, "Prediction requested without a model");
            return Err(ApiError::model_not_loaded());
        }
    };

    match ctx.predict(&input) {
        Ok(value) => Ok(Json(PredictionResponse {
            predicted_npv: value,
            status: "success",
        })),
        Err(e) => {
            error!(error = %e, gs = %input.gs, "Prediction failed");
            Err(ApiError::internal())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn sample() -> WellInput {
        WellInput {
            heff: 15.0,
            perm: 150.0,
            sg: 0.75,
            l_hor: 600.0,
            gs: "S-TYPE".to_string(),
            temp: 25.0,
            c5: 0.6,
            grp: 2,
            n_gs: 3,
        }
    }

    #[tokio::test]
    async fn test_root_banner_reports_active() {
        let Json(banner) = root(State(ServiceState::unloaded("no artifacts"))).await;
        assert_eq!(banner.message, "NPV Prediction API");
        assert_eq!(banner.status, "active");
        assert!(!banner.model_loaded);
    }

    #[tokio::test]
    async fn test_health_without_model() {
        let response = health(State(ServiceState::unloaded("no artifacts"))).await;
        assert_eq!(response.status, "healthy");
        assert!(!response.model_loaded);
    }

    #[tokio::test]
    async fn test_predict_without_model_is_503() {
        let err = predict(State(ServiceState::unloaded("no artifacts")), Ok(Json(sample())))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_validation_precedes_model_check() {
        let mut bad = sample();
        bad.sg = 2.0;
        let err = predict(State(ServiceState::unloaded("no artifacts")), Ok(Json(bad)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_model_info_without_model() {
        let Json(info) = model_info(State(ServiceState::unloaded("x"))).await;
        let v = serde_json::to_value(info).unwrap();
        assert_eq!(v["error"], "Model not loaded");
    }
}
