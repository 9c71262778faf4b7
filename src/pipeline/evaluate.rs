//! Stage 3: re-score the persisted model on the held-out partition.

use tracing::info;

use super::PipelineError;
use crate::config::PipelineConfig;
use crate::model::{metrics, NpvRegressor};
use crate::preprocessing::ProcessedSplit;
use crate::storage;
use crate::types::{EvaluationDocument, PredictionStats, ResidualStats, TestMetrics};

/// Evaluate `model` on the split's test rows.
pub fn evaluate(model: &NpvRegressor, split: &ProcessedSplit) -> Result<EvaluationDocument, PipelineError> {
    if model.feature_names() != split.feature_names.as_slice() {
        return Err(PipelineError::Inconsistent(format!(
            "model expects {:?} but split has {:?}",
            model.feature_names(),
            split.feature_names
        )));
    }

    let y_true = &split.y_test;
    let y_pred = model.predict(&split.x_test)?;
    let residuals: Vec<f64> = y_true.iter().zip(&y_pred).map(|(t, p)| t - p).collect();

    Ok(EvaluationDocument {
        test_metrics: TestMetrics {
            mae: metrics::mae(y_true, &y_pred),
            r2: metrics::r2(y_true, &y_pred),
            mape: metrics::mape(y_true, &y_pred),
        },
        predictions_stats: PredictionStats {
            actual_mean: metrics::mean(y_true),
            predicted_mean: metrics::mean(&y_pred),
            actual_std: metrics::sample_std(y_true),
            predicted_std: metrics::population_std(&y_pred),
        },
        residuals_analysis: ResidualStats {
            residuals_mean: metrics::mean(&residuals),
            residuals_std: metrics::sample_std(&residuals),
        },
    })
}

pub fn run(config: &PipelineConfig) -> Result<EvaluationDocument, PipelineError> {
    let model = NpvRegressor::load(&config.artifacts.model_path)?;
    let split: ProcessedSplit = storage::read_json(&config.data.processed_path)?;

    let doc = evaluate(&model, &split)?;
    storage::write_json(&config.artifacts.evaluation_path, &doc)?;
    info!(
        mae = doc.test_metrics.mae,
        r2 = doc.test_metrics.r2,
        residuals_mean = doc.residuals_analysis.residuals_mean,
        path = %config.artifacts.evaluation_path.display(),
        "Evaluation written"
    );
    Ok(doc)
}
