//! Gradient-boosted regression trees over encoded well features.

use chrono::{DateTime, Utc};
use gbdt::decision_tree::{Data, DataVec};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use super::booster::Booster;
use super::ModelError;
use crate::config::Hyperparameters;
use crate::storage::{self, ArtifactError};

/// Closed set of model families the service knows how to describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    GradientBoostedTrees,
    /// Artifact written by a newer or foreign trainer
    #[serde(other)]
    Unknown,
}

impl ModelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GradientBoostedTrees => "GradientBoostedTrees",
            Self::Unknown => "Unknown",
        }
    }
}

/// Persisted model document.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub kind: ModelKind,
    /// Training column order; prediction rows must follow it
    pub feature_names: Vec<String>,
    pub hyperparameters: Hyperparameters,
    /// Seed for row and feature sampling
    #[serde(default)]
    pub random_state: u64,
    pub trained_at: DateTime<Utc>,
    #[serde(default)]
    pub booster: Option<Booster>,
}

/// Fitted NPV regressor.
#[derive(Debug)]
pub struct NpvRegressor {
    artifact: ModelArtifact,
}

fn check_width(rows: &[Vec<f64>], expected: usize) -> Result<(), ModelError> {
    match rows.iter().position(|r| r.len() != expected) {
        Some(row) => Err(ModelError::FeatureCountMismatch {
            row,
            expected,
            found: rows[row].len(),
        }),
        None => Ok(()),
    }
}

fn to_features(row: &[f64]) -> Vec<f32> {
    row.iter().map(|&v| v as f32).collect()
}

impl NpvRegressor {
    /// Fit a new booster on `x` (rows in `feature_names` order) and `y`.
    ///
    /// The same `random_state` reproduces the same model.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        feature_names: Vec<String>,
        hyperparameters: &Hyperparameters,
        random_state: u64,
    ) -> Result<Self, ModelError> {
        if x.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if x.len() != y.len() {
            return Err(ModelError::LengthMismatch {
                features: x.len(),
                targets: y.len(),
            });
        }
        check_width(x, feature_names.len())?;

        let mut data: DataVec = x
            .iter()
            .zip(y)
            .map(|(row, &label)| Data::new_training_data(to_features(row), 1.0, label as f32, None))
            .collect();

        let booster = Booster::fit(&mut data, feature_names.len(), hyperparameters, random_state);
        debug!(
            samples = x.len(),
            features = feature_names.len(),
            trees = booster.trees.len(),
            random_state,
            "Booster fitted"
        );

        Ok(Self {
            artifact: ModelArtifact {
                kind: ModelKind::GradientBoostedTrees,
                feature_names,
                hyperparameters: hyperparameters.clone(),
                random_state,
                trained_at: Utc::now(),
                booster: Some(booster),
            },
        })
    }

    /// Predict one value per row.
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        let booster = match (&self.artifact.kind, &self.artifact.booster) {
            (ModelKind::GradientBoostedTrees, Some(b)) => b,
            (kind, _) => return Err(ModelError::UnsupportedKind(kind.as_str().to_string())),
        };
        check_width(rows, self.n_features())?;

        let data: DataVec = rows
            .iter()
            .map(|row| Data::new_test_data(to_features(row), None))
            .collect();
        Ok(booster.predict(&data).into_iter().map(f64::from).collect())
    }

    pub fn kind(&self) -> ModelKind {
        self.artifact.kind
    }

    pub fn feature_names(&self) -> &[String] {
        &self.artifact.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.artifact.feature_names.len()
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.artifact.hyperparameters
    }

    pub fn random_state(&self) -> u64 {
        self.artifact.random_state
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.artifact.trained_at
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        Self { artifact }
    }

    pub fn save(&self, path: &Path) -> Result<(), ArtifactError> {
        storage::write_json(path, &self.artifact)
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        storage::read_json(path).map(Self::from_artifact)
    }
}
