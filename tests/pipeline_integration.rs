//! Pipeline Integration Tests
//!
//! Runs the full stage sequence against the synthetic fixture table with the
//! in-memory tracking backend. Asserts on persisted artifacts, the tracked
//! run, and the registry status document.

mod common;

use npv_predictor::config::SearchConfig;
use npv_predictor::model::NpvRegressor;
use npv_predictor::pipeline::{self, evaluate, preprocess, register, report, train};
use npv_predictor::preprocessing::ProcessedSplit;
use npv_predictor::storage;
use npv_predictor::tracking::{ExperimentTracker, InMemoryTracking, RunStatus, TrackingHandle};
use npv_predictor::types::{EvaluationDocument, MetricsDocument, RegistryRecord, RegistryStatus};
use npv_predictor::PipelineError;

#[tokio::test]
async fn test_full_pipeline_with_tracking() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::fixture_config(dir.path(), 60);
    let backend = InMemoryTracking::new();

    let report = pipeline::run_all(&config, Some(TrackingHandle::new(&backend)))
        .await
        .unwrap();

    // Artifacts
    let a = &config.artifacts;
    for path in [
        &config.data.processed_path,
        &a.model_path,
        &a.encoder_path,
        &a.feature_columns_path,
        &a.metrics_path,
        &a.evaluation_path,
        &a.report_path,
        &a.registry_status_path,
    ] {
        assert!(path.exists(), "{} was not written", path.display());
    }

    // 60 rows, test_size 0.2 -> 12 held out
    assert_eq!(report.data_info.n_train, 48);
    assert_eq!(report.data_info.n_test, 12);
    assert_eq!(report.data_info.features_count, 10);
    assert_eq!(report.data_info.target, "NPV");
    assert_eq!(report.model_info.name, "gbdt");

    let metrics: MetricsDocument = storage::read_json(&a.metrics_path).unwrap();
    assert!(metrics.cv_std >= 0.0);
    assert_eq!(report.performance.cross_validation.mean, metrics.cv_mean);

    let evaluation: EvaluationDocument = storage::read_json(&a.evaluation_path).unwrap();
    assert_eq!(report.performance.test_set, evaluation.test_metrics);
    assert!(evaluation.test_metrics.r2 > 0.0, "r2 = {}", evaluation.test_metrics.r2);

    // Tracked run
    let runs = backend.runs();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.status, RunStatus::Finished);
    assert!(run.params.iter().any(|(k, v)| k == "n_estimators" && v == "60"));
    assert!(run.metrics.iter().any(|(k, _)| k == "cv_mean"));
    assert_eq!(run.artifacts.len(), 3);

    // Registry
    let record: RegistryRecord = storage::read_json(&a.registry_status_path).unwrap();
    assert_eq!(record.status, RegistryStatus::New);
    assert_eq!(record.name.as_deref(), Some("gbdt_NPV"));
    assert_eq!(record.version.as_deref(), Some("1"));
    assert_eq!(record.run_id.as_deref(), Some(run.info.run_id.as_str()));

    let versions = backend.versions("gbdt_NPV");
    assert_eq!(versions.len(), 1);
    assert!(versions[0].source.ends_with("/model"));
}

#[tokio::test]
async fn test_second_registration_adds_version_to_existing_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::fixture_config(dir.path(), 40);
    let backend = InMemoryTracking::new();

    pipeline::run_all(&config, Some(TrackingHandle::new(&backend)))
        .await
        .unwrap();
    train::run(&config, Some(&backend as &dyn ExperimentTracker)).await.unwrap();
    let record = register::run(&config, Some(TrackingHandle::new(&backend)))
        .await
        .unwrap();

    assert_eq!(record.status, RegistryStatus::Existing);
    assert_eq!(record.version.as_deref(), Some("2"));
    assert_eq!(backend.runs().len(), 2);
    assert_eq!(record.run_id.as_deref(), Some(backend.runs()[1].info.run_id.as_str()));
}

#[tokio::test]
async fn test_register_with_no_runs_writes_status() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::fixture_config(dir.path(), 10);
    let backend = InMemoryTracking::new();
    backend
        .create_experiment(&config.tracking.experiment_name)
        .await
        .unwrap();

    let record = register::run(&config, Some(TrackingHandle::new(&backend)))
        .await
        .unwrap();
    assert_eq!(record.status, RegistryStatus::NoRuns);
    assert_eq!(record.message.as_deref(), Some("no runs found"));

    let on_disk: RegistryRecord = storage::read_json(&config.artifacts.registry_status_path).unwrap();
    assert_eq!(on_disk, record);
}

#[tokio::test]
async fn test_registry_failure_is_recorded_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::fixture_config(dir.path(), 40);
    let backend = InMemoryTracking::with_failing_registry();

    let report = pipeline::run_all(&config, Some(TrackingHandle::new(&backend))).await;
    assert!(report.is_ok());

    let record: RegistryRecord = storage::read_json(&config.artifacts.registry_status_path).unwrap();
    assert_eq!(record.status, RegistryStatus::Error);
    assert!(record.message.is_some());
}

#[tokio::test]
async fn test_pipeline_without_tracking_skips_registration() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::fixture_config(dir.path(), 40);

    pipeline::run_all(&config, None).await.unwrap();
    assert!(config.artifacts.report_path.exists());
    assert!(!config.artifacts.registry_status_path.exists());
}

#[tokio::test]
async fn test_stages_rerun_independently() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::fixture_config(dir.path(), 40);

    let summary = preprocess::run(&config).unwrap();
    assert_eq!(summary.n_test, 8);
    let split: ProcessedSplit = storage::read_json(&config.data.processed_path).unwrap();
    assert_eq!(split.x_train.len(), summary.n_train);
    assert_eq!(split.n_features(), summary.n_features);

    train::run(&config, None).await.unwrap();
    let first = evaluate::run(&config).unwrap();
    let second = evaluate::run(&config).unwrap();
    assert_eq!(first, second);

    let doc = report::run(&config).unwrap();
    let on_disk: EvaluationDocument = storage::read_json(&config.artifacts.evaluation_path).unwrap();
    assert_eq!(doc.performance.test_set, on_disk.test_metrics);
}

#[tokio::test]
async fn test_subsampled_training_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::fixture_config(dir.path(), 50);
    config.model.hyperparameters.subsample = 0.7;
    config.model.hyperparameters.colsample = 0.8;
    preprocess::run(&config).unwrap();
    let split: ProcessedSplit = storage::read_json(&config.data.processed_path).unwrap();

    let first_doc = train::run(&config, None).await.unwrap();
    let first = NpvRegressor::load(&config.artifacts.model_path)
        .unwrap()
        .predict(&split.x_test)
        .unwrap();

    let second_doc = train::run(&config, None).await.unwrap();
    let second = NpvRegressor::load(&config.artifacts.model_path)
        .unwrap()
        .predict(&split.x_test)
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first_doc.cv_scores, second_doc.cv_scores);
    assert_eq!(first_doc.mae, second_doc.mae);
}

#[tokio::test]
async fn test_grid_search_trains_best_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::fixture_config(dir.path(), 60);
    config.training.search = Some(SearchConfig {
        n_estimators: vec![1, 60],
        ..SearchConfig::default()
    });
    let backend = InMemoryTracking::new();

    preprocess::run(&config).unwrap();
    let doc = train::run(&config, Some(&backend as &dyn ExperimentTracker))
        .await
        .unwrap();

    let search = doc.search.as_ref().expect("search summary recorded");
    assert_eq!(search.candidates, 2);
    assert_eq!(search.best_score, doc.cv_mean);
    assert_eq!(doc.hyperparameters.n_estimators, 60);
    assert_eq!(doc.cv_scores.len(), 3);

    let model = NpvRegressor::load(&config.artifacts.model_path).unwrap();
    assert_eq!(model.hyperparameters(), &doc.hyperparameters);

    let run = &backend.runs()[0];
    assert!(run.params.iter().any(|(k, v)| k == "n_estimators" && v == "60"));
    assert!(run.params.iter().any(|(k, v)| k == "search_candidates" && v == "2"));
    assert!(run.metrics.iter().any(|(k, _)| k == "search_best_score"));

    evaluate::run(&config).unwrap();
    let report = report::run(&config).unwrap();
    assert_eq!(report.model_info.hyperparameters, doc.hyperparameters);
}

#[tokio::test]
async fn test_workbook_input_preprocesses_like_csv() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::fixture_config(dir.path(), 40);
    preprocess::run(&config).unwrap();
    let from_csv: ProcessedSplit = storage::read_json(&config.data.processed_path).unwrap();

    let mut xlsx_config = config.clone();
    xlsx_config.data.raw_path = dir.path().join("data/raw/wells.xlsx");
    xlsx_config.data.processed_path = dir.path().join("data/processed/split_xlsx.json");
    common::write_synthetic_xlsx(&xlsx_config.data.raw_path, 40);
    preprocess::run(&xlsx_config).unwrap();
    let from_xlsx: ProcessedSplit = storage::read_json(&xlsx_config.data.processed_path).unwrap();

    assert_eq!(from_xlsx, from_csv);
}

#[tokio::test]
async fn test_evaluate_without_model_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::fixture_config(dir.path(), 40);
    preprocess::run(&config).unwrap();

    let err = evaluate::run(&config).unwrap_err();
    assert!(matches!(err, PipelineError::Artifact(_)), "{err}");
}

#[tokio::test]
async fn test_missing_raw_data_fails_preprocess() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::fixture_config(dir.path(), 10);
    config.data.raw_path = dir.path().join("absent.csv");

    let err = preprocess::run(&config).unwrap_err();
    assert!(matches!(err, PipelineError::Preprocess(_)), "{err}");
}
