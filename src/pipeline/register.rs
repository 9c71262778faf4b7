//! Stage 4: register the latest tracked run as a new model version.
//!
//! Registration never aborts the pipeline. Every attempt ends in a
//! [`RegistrationOutcome`], and the status document is written from it the
//! same way whatever happened.

use chrono::Utc;
use tracing::{error, info, warn};

use super::train::RUN_MODEL_DIR;
use super::PipelineError;
use crate::config::PipelineConfig;
use crate::storage;
use crate::tracking::{TrackingError, TrackingHandle};
use crate::types::{RegistryRecord, RegistryStatus};

/// Result of one registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered {
        name: String,
        version: String,
        run_id: String,
        /// The registered model did not exist before this attempt
        created: bool,
    },
    NoRuns,
    Failed(String),
}

impl RegistrationOutcome {
    pub fn to_record(&self) -> RegistryRecord {
        let timestamp = Utc::now();
        match self {
            Self::Registered {
                name,
                version,
                run_id,
                created,
            } => RegistryRecord {
                status: if *created {
                    RegistryStatus::New
                } else {
                    RegistryStatus::Existing
                },
                name: Some(name.clone()),
                version: Some(version.clone()),
                run_id: Some(run_id.clone()),
                timestamp,
                message: None,
            },
            Self::NoRuns => RegistryRecord {
                status: RegistryStatus::NoRuns,
                name: None,
                version: None,
                run_id: None,
                timestamp,
                message: Some("no runs found".to_string()),
            },
            Self::Failed(msg) => RegistryRecord {
                status: RegistryStatus::Error,
                name: None,
                version: None,
                run_id: None,
                timestamp,
                message: Some(msg.clone()),
            },
        }
    }
}

async fn try_register(
    handle: TrackingHandle<'_>,
    experiment_name: &str,
    model_name: &str,
) -> Result<RegistrationOutcome, TrackingError> {
    let Some(experiment_id) = handle.tracker.find_experiment(experiment_name).await? else {
        return Ok(RegistrationOutcome::NoRuns);
    };
    let Some(run) = handle.tracker.latest_run(&experiment_id).await? else {
        return Ok(RegistrationOutcome::NoRuns);
    };

    let created = !handle.registry.registered_model_exists(model_name).await?;
    if created {
        handle.registry.create_registered_model(model_name).await?;
        info!(model = model_name, "Registered model created");
    }

    let source = format!(
        "{}/{}",
        run.artifact_uri.trim_end_matches('/'),
        RUN_MODEL_DIR
    );
    let version = handle
        .registry
        .create_model_version(model_name, &source, &run.run_id)
        .await?;

    Ok(RegistrationOutcome::Registered {
        name: version.name,
        version: version.version,
        run_id: run.run_id,
        created,
    })
}

/// Register the most recent run of `experiment_name` under `model_name`.
pub async fn register_latest(
    handle: TrackingHandle<'_>,
    experiment_name: &str,
    model_name: &str,
) -> RegistrationOutcome {
    match try_register(handle, experiment_name, model_name).await {
        Ok(outcome) => outcome,
        Err(e) => RegistrationOutcome::Failed(e.to_string()),
    }
}

/// Attempt registration and write the status document.
///
/// Only a failure to write the status document is returned as an error.
pub async fn run(
    config: &PipelineConfig,
    tracking: Option<TrackingHandle<'_>>,
) -> Result<RegistryRecord, PipelineError> {
    let model_name = config.registered_model_name();
    let outcome = match tracking {
        Some(handle) => {
            register_latest(handle, &config.tracking.experiment_name, &model_name).await
        }
        None => RegistrationOutcome::Failed("experiment tracking is disabled".to_string()),
    };

    match &outcome {
        RegistrationOutcome::Registered {
            name,
            version,
            created,
            ..
        } => info!(model = %name, version = %version, new_model = created, "Model version registered"),
        RegistrationOutcome::NoRuns => warn!(
            experiment = %config.tracking.experiment_name,
            "No runs found, nothing to register"
        ),
        RegistrationOutcome::Failed(msg) => error!(model = %model_name, error = %msg, "Model registration failed"),
    }

    let record = outcome.to_record();
    storage::write_json(&config.artifacts.registry_status_path, &record)?;
    Ok(record)
}
