//! Stage 1: raw data -> processed split, encoder and feature-column list.

use tracing::{info, warn};

use super::PipelineError;
use crate::config::PipelineConfig;
use crate::dataset::RawDataset;
use crate::preprocessing::{build_features, train_test_split, PreprocessError, ProcessedSplit};
use crate::storage;

/// Sizes of the written split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessSummary {
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
}

pub fn run(config: &PipelineConfig) -> Result<PreprocessSummary, PipelineError> {
    info!(path = %config.data.raw_path.display(), "Loading raw data");
    let raw = RawDataset::load(&config.data.raw_path).map_err(PreprocessError::from)?;

    let frame = build_features(&raw, &config.features)?;
    info!(
        rows = frame.rows.len(),
        features = frame.feature_names.len(),
        "Features encoded"
    );
    warn!("Categorical encoder is fit before the train/test split; test categories are in its vocabulary");

    let indices = train_test_split(
        frame.rows.len(),
        config.preprocessing.test_size,
        config.preprocessing.random_state,
    )?;
    let split = ProcessedSplit::from_indices(
        frame.feature_names.clone(),
        &frame.rows,
        &frame.targets,
        &indices,
    );

    let artifacts = &config.artifacts;
    storage::write_json(&config.data.processed_path, &split)?;
    storage::write_json(&artifacts.encoder_path, &frame.encoder)?;
    storage::write_json(&artifacts.feature_columns_path, &frame.feature_names)?;

    let summary = PreprocessSummary {
        n_train: split.y_train.len(),
        n_test: split.y_test.len(),
        n_features: split.n_features(),
    };
    info!(
        n_train = summary.n_train,
        n_test = summary.n_test,
        n_features = summary.n_features,
        "Preprocessing complete"
    );
    Ok(summary)
}
