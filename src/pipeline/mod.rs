//! Training Pipeline Module
//!
//! ## Stage Sequence
//!
//! ```text
//! STAGE 1: preprocess  raw CSV -> processed split, encoder, feature columns
//! STAGE 2: train       split -> model, metrics (+ tracked run)
//! STAGE 3: evaluate    model + split -> evaluation
//! STAGE 4: register    latest tracked run -> registry status
//! STAGE 5: report      metrics + evaluation + config -> report
//! ```
//!
//! Each stage reads only persisted artifacts from earlier stages and
//! overwrites its own outputs wholesale, so any stage can be re-run on its
//! own from the CLI.

pub mod evaluate;
pub mod preprocess;
pub mod register;
pub mod report;
pub mod train;

pub use register::RegistrationOutcome;

use tracing::info;

use crate::config::PipelineConfig;
use crate::model::ModelError;
use crate::preprocessing::PreprocessError;
use crate::storage::ArtifactError;
use crate::tracking::{TrackingError, TrackingHandle};
use crate::types::ReportDocument;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("experiment tracking failed: {0}")]
    Tracking(#[from] TrackingError),
    #[error("inconsistent artifacts: {0}")]
    Inconsistent(String),
    #[error("training task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Run every stage in order. Registration is skipped when tracking is off.
pub async fn run_all(
    config: &PipelineConfig,
    tracking: Option<TrackingHandle<'_>>,
) -> Result<ReportDocument, PipelineError> {
    preprocess::run(config)?;
    train::run(config, tracking.map(|t| t.tracker)).await?;
    evaluate::run(config)?;
    match tracking {
        Some(handle) => {
            register::run(config, Some(handle)).await?;
        }
        None => info!("Tracking disabled, skipping model registration"),
    }
    let report = report::run(config)?;
    info!("Pipeline complete");
    Ok(report)
}
