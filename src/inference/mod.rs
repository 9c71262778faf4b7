//! Inference Context
//!
//! Everything the prediction service needs, loaded once at startup and
//! shared read-only: the fitted regressor, the fitted encoder and the
//! training column order.

use std::collections::HashMap;
use tracing::debug;

use crate::config::ArtifactConfig;
use crate::model::{ModelError, ModelKind, NpvRegressor};
use crate::preprocessing::{EncodeError, OneHotEncoder};
use crate::storage::{self, ArtifactError};
use crate::types::WellInput;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("inconsistent artifacts: {0}")]
    InconsistentArtifacts(String),
    #[error("encoding failed: {0}")]
    Encode(#[from] EncodeError),
    #[error("feature columns do not match training layout (missing: {missing:?}, unexpected: {unexpected:?})")]
    ColumnMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("model produced a non-finite prediction")]
    NonFinite,
}

/// Immutable bundle of model, encoder and column order.
pub struct InferenceContext {
    model: NpvRegressor,
    encoder: OneHotEncoder,
    feature_columns: Vec<String>,
}

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl InferenceContext {
    /// Assemble a context, checking that the column list matches the model
    /// and that every encoder output is one of the columns.
    pub fn new(
        model: NpvRegressor,
        encoder: OneHotEncoder,
        feature_columns: Vec<String>,
    ) -> Result<Self, InferenceError> {
        if model.feature_names() != feature_columns.as_slice() {
            return Err(InferenceError::InconsistentArtifacts(format!(
                "feature columns {:?} do not match model columns {:?}",
                feature_columns,
                model.feature_names()
            )));
        }
        encoder
            .validate()
            .map_err(|e| InferenceError::InconsistentArtifacts(format!("encoder: {e}")))?;
        let stray: Vec<String> = encoder
            .feature_names()
            .into_iter()
            .filter(|name| !feature_columns.contains(name))
            .collect();
        if !stray.is_empty() {
            return Err(InferenceError::InconsistentArtifacts(format!(
                "encoder outputs {stray:?} are not feature columns"
            )));
        }
        Ok(Self {
            model,
            encoder,
            feature_columns,
        })
    }

    /// Load model, encoder and feature columns from their artifact files.
    pub fn load(artifacts: &ArtifactConfig) -> Result<Self, InferenceError> {
        let model = NpvRegressor::load(&artifacts.model_path)?;
        let encoder: OneHotEncoder = storage::read_json(&artifacts.encoder_path)?;
        let feature_columns: Vec<String> = storage::read_json(&artifacts.feature_columns_path)?;
        Self::new(model, encoder, feature_columns)
    }

    pub fn model_kind(&self) -> ModelKind {
        self.model.kind()
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Build the feature row for `input` in training column order.
    ///
    /// The set of produced columns must equal the training set exactly.
    pub fn feature_row(&self, input: &WellInput) -> Result<Vec<f64>, InferenceError> {
        let mut values: HashMap<String, f64> = input
            .numeric_features()
            .into_iter()
            .map(|(name, v)| (name.to_string(), v))
            .collect();
        values.extend(self.encoder.transform_one(&input.categorical_features())?);

        let missing: Vec<String> = self
            .feature_columns
            .iter()
            .filter(|c| !values.contains_key(*c))
            .cloned()
            .collect();
        let mut unexpected: Vec<String> = values
            .keys()
            .filter(|k| !self.feature_columns.contains(*k))
            .cloned()
            .collect();
        if !missing.is_empty() || !unexpected.is_empty() {
            unexpected.sort();
            return Err(InferenceError::ColumnMismatch { missing, unexpected });
        }

        Ok(self.feature_columns.iter().map(|c| values[c]).collect())
    }

    /// Predict NPV for one well, rounded to two decimals.
    pub fn predict(&self, input: &WellInput) -> Result<f64, InferenceError> {
        let row = self.feature_row(input)?;
        let raw = self
            .model
            .predict(std::slice::from_ref(&row))?
            .into_iter()
            .next()
            .ok_or(InferenceError::NonFinite)?;
        if !raw.is_finite() {
            return Err(InferenceError::NonFinite);
        }
        debug!(raw, "Prediction computed");
        Ok(round2(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Hyperparameters;
    use crate::preprocessing::{EncodedColumn, UnknownCategory};

    fn names() -> Vec<String> {
        [
            "Heff", "Perm", "Sg", "L_hor", "temp", "C5", "GRP", "nGS", "GS_S-TYPE", "GS_U-TYPE",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn context_with(columns: Vec<String>) -> Result<InferenceContext, InferenceError> {
        context_with_categories(columns, &["GS", "S-TYPE", "U-TYPE"])
    }

    fn context_with_categories(
        columns: Vec<String>,
        categories: &[&str],
    ) -> Result<InferenceContext, InferenceError> {
        let encoder = OneHotEncoder {
            columns: vec![EncodedColumn {
                name: "GS".to_string(),
                categories: categories.iter().map(|s| s.to_string()).collect(),
            }],
            handle_unknown: UnknownCategory::Reference,
        };
        let x: Vec<Vec<f64>> = (0..30)
            .map(|i| {
                let f = i as f64;
                vec![f, 100.0 + f, 0.5, 500.0, 20.0, 0.5, 2.0, 1.0, (i % 3 == 1) as u8 as f64, (i % 3 == 2) as u8 as f64]
            })
            .collect();
        let y: Vec<f64> = (0..30).map(|i| 10.0 + i as f64).collect();
        let hp = Hyperparameters {
            n_estimators: 10,
            ..Hyperparameters::default()
        };
        let model = NpvRegressor::fit(&x, &y, names(), &hp, 42).unwrap();
        InferenceContext::new(model, encoder, columns)
    }

    fn input() -> WellInput {
        WellInput {
            heff: 15.0,
            perm: 150.0,
            sg: 0.75,
            l_hor: 600.0,
            gs: "S-TYPE".to_string(),
            temp: 25.0,
            c5: 0.6,
            grp: 2,
            n_gs: 3,
        }
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(-1.235_1), -1.24);
    }

    #[test]
    fn test_feature_row_follows_training_order() {
        let ctx = context_with(names()).unwrap();
        let row = ctx.feature_row(&input()).unwrap();
        assert_eq!(row, vec![15.0, 150.0, 0.75, 600.0, 25.0, 0.6, 2.0, 3.0, 1.0, 0.0]);
    }

    #[test]
    fn test_mismatched_column_artifact_rejected_at_load() {
        let mut cols = names();
        cols.swap(0, 1);
        assert!(matches!(
            context_with(cols),
            Err(InferenceError::InconsistentArtifacts(_))
        ));
    }

    #[test]
    fn test_empty_encoder_vocabulary_rejected_at_load() {
        match context_with_categories(names(), &[]) {
            Err(InferenceError::InconsistentArtifacts(reason)) => {
                assert!(reason.contains("GS"), "{reason}")
            }
            other => panic!("expected inconsistent artifacts, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_encoder_outputs_outside_columns_rejected_at_load() {
        let result = context_with_categories(names(), &["GS", "S-TYPE", "U-TYPE", "VGS"]);
        match result {
            Err(InferenceError::InconsistentArtifacts(reason)) => {
                assert!(reason.contains("GS_VGS"), "{reason}")
            }
            other => panic!("expected inconsistent artifacts, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_narrower_encoder_is_column_mismatch() {
        let ctx = context_with_categories(names(), &["GS", "S-TYPE"]).unwrap();
        match ctx.feature_row(&input()) {
            Err(InferenceError::ColumnMismatch { missing, unexpected }) => {
                assert_eq!(missing, vec!["GS_U-TYPE"]);
                assert!(unexpected.is_empty());
            }
            other => panic!("expected column mismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_prediction_is_deterministic_and_rounded() {
        let ctx = context_with(names()).unwrap();
        let a = ctx.predict(&input()).unwrap();
        let b = ctx.predict(&input()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, round2(a));
    }

    #[test]
    fn test_unseen_category_predicts_like_reference() {
        let ctx = context_with(names()).unwrap();
        let mut unseen = input();
        unseen.gs = "J-TYPE".to_string();
        let mut reference = input();
        reference.gs = "GS".to_string();
        assert_eq!(ctx.predict(&unseen).unwrap(), ctx.predict(&reference).unwrap());
    }
}
