//! Regression model: gradient-boosted trees, scoring, cross-validation and
//! grid search.

pub mod booster;
pub mod cross_validation;
pub mod metrics;
mod regressor;
pub mod search;

pub use booster::Booster;
pub use cross_validation::{cross_validate, kfold_indices};
pub use regressor::{ModelArtifact, ModelKind, NpvRegressor};
pub use search::{grid_search, SearchOutcome};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("{features} feature rows but {targets} targets")]
    LengthMismatch { features: usize, targets: usize },
    #[error("row {row} has {found} features, expected {expected}")]
    FeatureCountMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("cannot run {folds}-fold cross-validation on {samples} samples")]
    TooFewSamples { samples: usize, folds: usize },
    #[error("model kind '{0}' cannot make predictions")]
    UnsupportedKind(String),
    #[error("hyperparameter grid has no candidates")]
    EmptyGrid,
}

/// Cross-validation scoring metric. Error metrics are negated so that
/// larger is always better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    R2,
    NegMeanAbsoluteError,
    NegMeanSquaredError,
    NegMeanAbsolutePercentageError,
}

impl Scoring {
    pub fn score(self, y_true: &[f64], y_pred: &[f64]) -> f64 {
        match self {
            Self::R2 => metrics::r2(y_true, y_pred),
            Self::NegMeanAbsoluteError => -metrics::mae(y_true, y_pred),
            Self::NegMeanSquaredError => -metrics::mse(y_true, y_pred),
            Self::NegMeanAbsolutePercentageError => -metrics::mape(y_true, y_pred),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::R2 => "r2",
            Self::NegMeanAbsoluteError => "neg_mean_absolute_error",
            Self::NegMeanSquaredError => "neg_mean_squared_error",
            Self::NegMeanAbsolutePercentageError => "neg_mean_absolute_percentage_error",
        }
    }
}

impl std::fmt::Display for Scoring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_scorers_are_negated() {
        let y = [1.0, 2.0, 3.0];
        let p = [2.0, 2.0, 2.0];
        assert!((Scoring::NegMeanAbsoluteError.score(&y, &p) + 2.0 / 3.0).abs() < 1e-12);
        assert!((Scoring::NegMeanSquaredError.score(&y, &p) + 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(Scoring::R2.score(&y, &y), 1.0);
    }

    #[test]
    fn test_scoring_serde_names_match_display() {
        for s in [
            Scoring::R2,
            Scoring::NegMeanAbsoluteError,
            Scoring::NegMeanSquaredError,
            Scoring::NegMeanAbsolutePercentageError,
        ] {
            let json = serde_json::to_string(&s).unwrap();
            assert_eq!(json, format!("\"{}\"", s));
        }
    }
}
