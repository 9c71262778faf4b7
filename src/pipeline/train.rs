//! Stage 2: fit the regressor, score it, and record the run.

use tracing::{error, info, warn};

use super::PipelineError;
use crate::config::PipelineConfig;
use crate::model::{cross_validate, grid_search, metrics, NpvRegressor};
use crate::preprocessing::ProcessedSplit;
use crate::storage;
use crate::tracking::{ExperimentTracker, RunInfo, RunStatus};
use crate::types::{MetricsDocument, SearchSummary};

/// Artifact directory inside the tracked run.
pub const RUN_MODEL_DIR: &str = "model";

/// Fit on the training partition and score with CV and the held-out set.
///
/// With a `[training.search]` grid, the grid point with the best mean CV
/// score is refitted on the whole training partition and its fold scores
/// are reported.
pub fn fit_and_score(
    config: &PipelineConfig,
    split: &ProcessedSplit,
) -> Result<(NpvRegressor, MetricsDocument), PipelineError> {
    let training = &config.training;
    let scoring = training.scoring;
    let random_state = config.preprocessing.random_state;

    let (hp, cv_scores, search) = match &training.search {
        Some(grid) => {
            let outcome = grid_search(
                &split.x_train,
                &split.y_train,
                &split.feature_names,
                &config.model.hyperparameters,
                grid,
                training,
                random_state,
            )?;
            let summary = SearchSummary {
                candidates: outcome.candidates,
                best_score: outcome.best_score,
            };
            (outcome.best, outcome.cv_scores, Some(summary))
        }
        None => {
            let hp = config.model.hyperparameters.clone();
            let cv_scores = cross_validate(
                &split.x_train,
                &split.y_train,
                &split.feature_names,
                &hp,
                training.cv_folds,
                scoring,
                random_state,
            )?;
            (hp, cv_scores, None)
        }
    };

    info!(
        model = %config.model.name,
        n_estimators = hp.n_estimators,
        max_depth = hp.max_depth,
        learning_rate = hp.learning_rate,
        subsample = hp.subsample,
        random_state,
        "Training model"
    );
    let model = NpvRegressor::fit(
        &split.x_train,
        &split.y_train,
        split.feature_names.clone(),
        &hp,
        random_state,
    )?;

    let y_pred = model.predict(&split.x_test)?;
    let doc = MetricsDocument {
        mae: metrics::mae(&split.y_test, &y_pred),
        r2: metrics::r2(&split.y_test, &y_pred),
        mape: metrics::mape(&split.y_test, &y_pred),
        cv_mean: metrics::mean(&cv_scores),
        cv_std: metrics::population_std(&cv_scores),
        cv_scores,
        scoring,
        n_features: split.n_features(),
        n_train: split.y_train.len(),
        n_test: split.y_test.len(),
        hyperparameters: hp,
        search,
    };
    info!(
        mae = doc.mae,
        r2 = doc.r2,
        mape = doc.mape,
        cv_mean = doc.cv_mean,
        cv_std = doc.cv_std,
        scoring = %scoring,
        "Model scored"
    );
    Ok((model, doc))
}

fn train_and_persist(config: &PipelineConfig) -> Result<MetricsDocument, PipelineError> {
    let split: ProcessedSplit = storage::read_json(&config.data.processed_path)?;
    let (model, doc) = fit_and_score(config, &split)?;

    model.save(&config.artifacts.model_path)?;
    storage::write_json(&config.artifacts.metrics_path, &doc)?;
    info!(
        model = %config.artifacts.model_path.display(),
        metrics = %config.artifacts.metrics_path.display(),
        "Model and metrics saved"
    );
    Ok(doc)
}

/// Run `train_and_persist` on the blocking pool.
async fn train_off_runtime(config: &PipelineConfig) -> Result<MetricsDocument, PipelineError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || train_and_persist(&config)).await?
}

async fn log_run(
    config: &PipelineConfig,
    tracker: &dyn ExperimentTracker,
    run: &RunInfo,
) -> Result<MetricsDocument, PipelineError> {
    let doc = train_off_runtime(config).await?;

    let mut params = doc.hyperparameters.as_params();
    params.push(("model_name".to_string(), config.model.name.clone()));
    params.push(("cv_folds".to_string(), config.training.cv_folds.to_string()));
    params.push(("scoring".to_string(), config.training.scoring.to_string()));
    params.push((
        "random_state".to_string(),
        config.preprocessing.random_state.to_string(),
    ));
    if let Some(search) = &doc.search {
        params.push(("search_candidates".to_string(), search.candidates.to_string()));
    }
    tracker.log_params(&run.run_id, &params).await?;
    tracker.log_metrics(&run.run_id, &doc.tracked_metrics()).await?;

    let artifacts = &config.artifacts;
    for file in [
        &artifacts.model_path,
        &artifacts.encoder_path,
        &artifacts.feature_columns_path,
    ] {
        tracker.log_artifact(run, file, RUN_MODEL_DIR).await?;
    }
    Ok(doc)
}

/// Train, persist model and metrics, and log the run when a tracker is given.
///
/// The tracked run is closed as FINISHED on success and FAILED on any error;
/// the original error is returned either way.
pub async fn run(
    config: &PipelineConfig,
    tracker: Option<&dyn ExperimentTracker>,
) -> Result<MetricsDocument, PipelineError> {
    let Some(tracker) = tracker else {
        return train_off_runtime(config).await;
    };

    let experiment_id = tracker
        .get_or_create_experiment(&config.tracking.experiment_name)
        .await?;
    let run = tracker.create_run(&experiment_id).await?;
    info!(
        backend = tracker.backend_name(),
        experiment = %config.tracking.experiment_name,
        run_id = %run.run_id,
        "Tracked run started"
    );

    match log_run(config, tracker, &run).await {
        Ok(doc) => {
            tracker.end_run(&run.run_id, RunStatus::Finished).await?;
            info!(run_id = %run.run_id, "Tracked run finished");
            Ok(doc)
        }
        Err(e) => {
            error!(run_id = %run.run_id, error = %e, "Training failed");
            if let Err(end_err) = tracker.end_run(&run.run_id, RunStatus::Failed).await {
                warn!(run_id = %run.run_id, error = %end_err, "Could not mark run as failed");
            }
            Err(e)
        }
    }
}
