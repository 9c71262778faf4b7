//! API route definitions
//!
//! - `GET  /`           - service banner
//! - `GET  /health`     - liveness and model availability
//! - `GET  /model_info` - loaded model description
//! - `POST /predict`    - NPV prediction for one well

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, ServiceState};

/// Create all prediction API routes
pub fn api_routes(state: ServiceState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/model_info", get(handlers::model_info))
        .route("/predict", post(handlers::predict))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn create_test_state() -> ServiceState {
        ServiceState::unloaded("test")
    }

    #[tokio::test]
    async fn test_api_routes_root() {
        let app = api_routes(create_test_state());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_routes_model_info_ok_without_model() {
        let app = api_routes(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/model_info")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_routes_predict_requires_post() {
        let app = api_routes(create_test_state());

        let response = app
            .oneshot(Request::builder().uri("/predict").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
