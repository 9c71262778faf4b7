//! Dashboard route handlers.

use axum::extract::rejection::FormRejection;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::Deserialize;
use tracing::{info, warn};

use super::history::HistoryEntry;
use super::views::{self, LocalDocuments, PageModel, PredictionOutcome};
use super::DashboardState;
use crate::types::WellInput;

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    /// Preset to load into the form
    pub example: Option<u8>,
}

async fn render(state: &DashboardState, form: &WellInput, outcome: Option<&PredictionOutcome>) -> Html<String> {
    let (api_healthy, model_info) = tokio::join!(state.client.health(), state.client.model_info());
    let history = state.history.recent().await;
    let local = LocalDocuments::load(&state.artifacts, state.config_path.as_deref());

    Html(views::render_page(&PageModel {
        api_url: state.client.base_url(),
        api_healthy,
        model_info: model_info.as_ref(),
        form,
        trajectory_types: &state.trajectory_types,
        outcome,
        history: &history,
        local: &local,
    }))
}

/// GET / - form, status panels and history
pub async fn index(State(state): State<DashboardState>, Query(query): Query<IndexQuery>) -> Html<String> {
    let form = query
        .example
        .map(views::example_input)
        .unwrap_or_else(views::default_input);
    render(&state, &form, None).await
}

/// POST /predict - submit the form to the prediction service
pub async fn predict(
    State(state): State<DashboardState>,
    form: Result<Form<WellInput>, FormRejection>,
) -> Html<String> {
    let input = match form {
        Ok(Form(input)) => input,
        Err(rejection) => {
            let outcome = PredictionOutcome::Error(rejection.body_text());
            return render(&state, &views::default_input(), Some(&outcome)).await;
        }
    };

    let outcome = match state.client.predict(&input).await {
        Ok(predicted_npv) => {
            info!(predicted_npv, gs = %input.gs, "Prediction received");
            state.history.record(input.clone(), predicted_npv).await;
            PredictionOutcome::Success {
                input: input.clone(),
                predicted_npv,
            }
        }
        Err(e) => {
            warn!(error = %e, "Prediction request failed");
            PredictionOutcome::Error(e.to_string())
        }
    };
    render(&state, &input, Some(&outcome)).await
}

/// GET /history - prediction log as JSON, newest first
pub async fn history(State(state): State<DashboardState>) -> Json<Vec<HistoryEntry>> {
    Json(state.history.recent().await)
}

/// POST /history/clear
pub async fn clear_history(State(state): State<DashboardState>) -> Response {
    state.history.clear().await;
    info!("Prediction history cleared");
    Redirect::to("/").into_response()
}
