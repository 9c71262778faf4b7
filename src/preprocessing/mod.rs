//! Feature engineering for the raw well table.
//!
//! Numeric columns keep their raw-file order and come first; one-hot
//! indicator columns follow in the order the categorical columns are
//! configured. The resulting column sequence is the canonical layout every
//! later stage (and the prediction service) must reproduce.

pub mod encoder;
pub mod split;

pub use encoder::{EncodeError, EncodedColumn, OneHotEncoder, UnknownCategory};
pub use split::{train_test_split, ProcessedSplit, SplitIndices};

use tracing::debug;

use crate::config::FeatureConfig;
use crate::dataset::{DatasetError, RawDataset};

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("configured column '{0}' is not present in the raw data")]
    MissingColumn(String),
    #[error("no feature columns remain after dropping target and excluded columns")]
    NoFeatures,
    #[error("cannot split {rows} rows with test_size {test_size}: both partitions must be non-empty")]
    TooFewRows { rows: usize, test_size: f64 },
}

/// Encoded design matrix with its target vector and fitted encoder.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
    pub encoder: OneHotEncoder,
}

/// Drop excluded columns, parse numerics and one-hot encode categoricals.
///
/// The encoder is fit on every row it is given; splitting happens later.
pub fn build_features(raw: &RawDataset, features: &FeatureConfig) -> Result<FeatureFrame, PreprocessError> {
    for name in features
        .drop_columns
        .iter()
        .chain(&features.categorical_columns)
        .chain(std::iter::once(&features.target))
    {
        if raw.column_index(name).is_none() {
            return Err(PreprocessError::MissingColumn(name.clone()));
        }
    }

    let targets = raw.numeric_column(&features.target)?;

    let numeric_names: Vec<String> = raw
        .columns()
        .iter()
        .filter(|&c| {
            *c != features.target
                && !features.drop_columns.contains(c)
                && !features.categorical_columns.contains(c)
        })
        .cloned()
        .collect();
    let numeric_columns = numeric_names
        .iter()
        .map(|name| raw.numeric_column(name))
        .collect::<Result<Vec<_>, _>>()?;

    let categorical_values = features
        .categorical_columns
        .iter()
        .map(|name| raw.text_column(name))
        .collect::<Result<Vec<_>, _>>()?;
    let fit_input: Vec<(&str, &[String])> = features
        .categorical_columns
        .iter()
        .map(String::as_str)
        .zip(categorical_values.iter().map(Vec::as_slice))
        .collect();
    let encoder = OneHotEncoder::fit(&fit_input)?;
    let encoded = encoder.transform(&categorical_values)?;

    let mut feature_names = numeric_names;
    feature_names.extend(encoder.feature_names());
    if feature_names.is_empty() {
        return Err(PreprocessError::NoFeatures);
    }

    let rows: Vec<Vec<f64>> = (0..raw.n_rows())
        .map(|i| {
            let mut row: Vec<f64> = numeric_columns.iter().map(|col| col[i]).collect();
            if let Some(enc) = encoded.get(i) {
                row.extend_from_slice(enc);
            }
            row
        })
        .collect();

    debug!(
        rows = rows.len(),
        features = feature_names.len(),
        "Feature matrix built"
    );

    Ok(FeatureFrame {
        feature_names,
        rows,
        targets,
        encoder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const RAW: &str = "\
Heff,Perm,GS,gas rate,NPV
10,100,U-TYPE,5,1.0
11,110,GS,6,2.0
12,120,S-TYPE,7,3.0
13,130,U-TYPE,8,4.0
";

    fn feature_config() -> FeatureConfig {
        FeatureConfig {
            target: "NPV".to_string(),
            drop_columns: vec!["gas rate".to_string()],
            categorical_columns: vec!["GS".to_string()],
        }
    }

    #[test]
    fn test_layout_numeric_then_indicators() {
        let raw = RawDataset::from_reader(Cursor::new(RAW)).unwrap();
        let frame = build_features(&raw, &feature_config()).unwrap();
        assert_eq!(frame.feature_names, vec!["Heff", "Perm", "GS_S-TYPE", "GS_U-TYPE"]);
        assert_eq!(frame.rows[0], vec![10.0, 100.0, 0.0, 1.0]);
        assert_eq!(frame.rows[1], vec![11.0, 110.0, 0.0, 0.0]);
        assert_eq!(frame.targets, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_missing_drop_column_is_fatal() {
        let raw = RawDataset::from_reader(Cursor::new(RAW)).unwrap();
        let mut cfg = feature_config();
        cfg.drop_columns.push("sum cond".to_string());
        assert!(matches!(
            build_features(&raw, &cfg),
            Err(PreprocessError::MissingColumn(c)) if c == "sum cond"
        ));
    }

    #[test]
    fn test_non_numeric_feature_is_fatal() {
        let raw = RawDataset::from_reader(Cursor::new("a,NPV\nx,1\n")).unwrap();
        let cfg = FeatureConfig {
            target: "NPV".to_string(),
            drop_columns: vec![],
            categorical_columns: vec![],
        };
        assert!(matches!(
            build_features(&raw, &cfg),
            Err(PreprocessError::Dataset(DatasetError::NotNumeric { .. }))
        ));
    }
}
