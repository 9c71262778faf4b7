//! JSON documents written by the pipeline stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Hyperparameters;
use crate::model::Scoring;

// ============================================================================
// Train stage
// ============================================================================

/// Written by the train stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsDocument {
    /// Held-out mean absolute error
    pub mae: f64,
    pub r2: f64,
    /// Held-out MAPE as a fraction
    pub mape: f64,
    pub cv_mean: f64,
    /// Population standard deviation of `cv_scores`
    pub cv_std: f64,
    pub cv_scores: Vec<f64>,
    pub scoring: Scoring,
    pub n_features: usize,
    pub n_train: usize,
    pub n_test: usize,
    /// Hyperparameters of the persisted model
    #[serde(default)]
    pub hyperparameters: Hyperparameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchSummary>,
}

/// Grid search result; `cv_scores` then belong to the winning point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub candidates: usize,
    pub best_score: f64,
}

impl MetricsDocument {
    /// `(key, value)` pairs logged to the experiment tracker.
    pub fn tracked_metrics(&self) -> Vec<(String, f64)> {
        let mut out = vec![
            ("mae".to_string(), self.mae),
            ("r2".to_string(), self.r2),
            ("mape".to_string(), self.mape),
            ("cv_mean".to_string(), self.cv_mean),
            ("cv_std".to_string(), self.cv_std),
        ];
        out.extend(
            self.cv_scores
                .iter()
                .enumerate()
                .map(|(i, s)| (format!("cv_fold_{i}"), *s)),
        );
        if let Some(search) = &self.search {
            out.push(("search_best_score".to_string(), search.best_score));
        }
        out
    }
}

// ============================================================================
// Evaluate stage
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestMetrics {
    pub mae: f64,
    pub r2: f64,
    pub mape: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionStats {
    pub actual_mean: f64,
    pub predicted_mean: f64,
    /// Sample standard deviation
    pub actual_std: f64,
    /// Population standard deviation
    pub predicted_std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualStats {
    pub residuals_mean: f64,
    /// Sample standard deviation
    pub residuals_std: f64,
}

/// Written by the evaluate stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationDocument {
    pub test_metrics: TestMetrics,
    pub predictions_stats: PredictionStats,
    pub residuals_analysis: ResidualStats,
}

// ============================================================================
// Report stage
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    pub hyperparameters: Hyperparameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationSummary {
    pub scoring: Scoring,
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub cross_validation: CrossValidationSummary,
    pub test_set: TestMetrics,
    pub predictions_quality: PredictionStats,
    pub residuals: ResidualStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInfo {
    pub target: String,
    pub categorical_columns: Vec<String>,
    pub features_count: usize,
    pub n_train: usize,
    pub n_test: usize,
}

/// Written by the report stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub timestamp: DateTime<Utc>,
    pub model_info: ModelSummary,
    pub performance: Performance,
    pub data_info: DataInfo,
}

// ============================================================================
// Register stage
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryStatus {
    /// Registered model created, first version added
    New,
    /// New version added to an existing registered model
    Existing,
    NoRuns,
    Error,
}

/// Written once per registration attempt, whatever its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub status: RegistryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
