//! Error envelope for the prediction API.
//!
//! Every error response has the shape `{ "detail": "..." }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Shown to clients when the model is missing at startup.
pub const MODEL_NOT_LOADED: &str = "Model not loaded. Run the training pipeline first.";

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

/// An HTTP error with a `{detail}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    /// Request failed validation (malformed body, missing field, out of range).
    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: detail.into(),
        }
    }

    pub fn model_not_loaded() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            detail: MODEL_NOT_LOADED.to_string(),
        }
    }

    /// Generic failure; the cause is logged, never returned.
    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: "Internal server error during prediction".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, axum::Json(ErrorBody { detail: self.detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_error_response_shape() {
        let resp = ApiError::unprocessable("Sg must be between 0 and 1").into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["detail"], "Sg must be between 0 and 1");
        assert_eq!(v.as_object().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_internal_error_is_generic() {
        let resp = ApiError::internal().into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["detail"], "Internal server error during prediction");
    }
}
