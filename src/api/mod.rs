//! REST API module using Axum
//!
//! HTTP surface of the prediction service. The inference context is built
//! once at startup and handed to every handler through router state.

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::{ModelState, ServiceState};

use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::defaults;

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `NPV_CORS_ORIGINS` to a comma-separated list of allowed origins so a
/// browser page served elsewhere (e.g. the dashboard) can call the API.
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match std::env::var("NPV_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

/// Create the complete prediction service router.
pub fn create_app(state: ServiceState) -> Router {
    routes::api_routes(state)
        .layer(RequestBodyLimitLayer::new(defaults::MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}
