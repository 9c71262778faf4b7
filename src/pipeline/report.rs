//! Stage 5: merge metrics, evaluation and configuration into one report.

use chrono::Utc;
use tracing::info;

use super::PipelineError;
use crate::config::PipelineConfig;
use crate::storage;
use crate::types::{
    CrossValidationSummary, DataInfo, EvaluationDocument, MetricsDocument, ModelSummary,
    Performance, ReportDocument,
};

pub fn build_report(
    config: &PipelineConfig,
    metrics: &MetricsDocument,
    evaluation: &EvaluationDocument,
) -> ReportDocument {
    ReportDocument {
        timestamp: Utc::now(),
        model_info: ModelSummary {
            name: config.model.name.clone(),
            hyperparameters: metrics.hyperparameters.clone(),
        },
        performance: Performance {
            cross_validation: CrossValidationSummary {
                scoring: metrics.scoring,
                mean: metrics.cv_mean,
                std: metrics.cv_std,
            },
            test_set: evaluation.test_metrics.clone(),
            predictions_quality: evaluation.predictions_stats.clone(),
            residuals: evaluation.residuals_analysis.clone(),
        },
        data_info: DataInfo {
            target: config.features.target.clone(),
            categorical_columns: config.features.categorical_columns.clone(),
            features_count: metrics.n_features,
            n_train: metrics.n_train,
            n_test: metrics.n_test,
        },
    }
}

pub fn run(config: &PipelineConfig) -> Result<ReportDocument, PipelineError> {
    let metrics: MetricsDocument = storage::read_json(&config.artifacts.metrics_path)?;
    let evaluation: EvaluationDocument = storage::read_json(&config.artifacts.evaluation_path)?;

    let report = build_report(config, &metrics, &evaluation);
    storage::write_json(&config.artifacts.report_path, &report)?;
    info!(path = %config.artifacts.report_path.display(), "Report written");
    Ok(report)
}
