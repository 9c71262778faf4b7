//! One-hot encoding for categorical well attributes (trajectory type).
//!
//! Categories are sorted lexicographically at fit time and the first one is
//! dropped as the reference level, so `k` categories expand into `k - 1`
//! indicator columns named `<column>_<category>`. A row of the reference
//! category encodes to all zeros.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EncodeError {
    #[error("categorical column '{0}' has no categories")]
    NoCategories(String),
    #[error("categorical column '{0}' lists a category twice")]
    DuplicateCategory(String),
    #[error("encoder has no column named '{0}'")]
    UnknownColumn(String),
    #[error("no value supplied for categorical column '{0}'")]
    MissingValue(String),
    #[error("unknown category '{value}' for column '{column}'")]
    UnknownCategory { column: String, value: String },
    #[error("column '{column}' has {found} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
}

/// Policy for categories not seen during fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategory {
    /// Encode as the dropped reference category (all indicators zero).
    #[default]
    Reference,
    /// Reject the row.
    Error,
}

/// Fitted vocabulary for one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedColumn {
    pub name: String,
    /// Sorted categories; `categories[0]` is the dropped reference.
    pub categories: Vec<String>,
}

impl EncodedColumn {
    /// Dropped reference category; `None` for an empty vocabulary.
    pub fn reference(&self) -> Option<&str> {
        self.categories.first().map(String::as_str)
    }

    fn indicator_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories
            .iter()
            .skip(1)
            .map(move |c| format!("{}_{}", self.name, c))
    }

    /// Indicator values for one category. `None` when the category is unseen.
    fn encode(&self, value: &str) -> Option<Vec<f64>> {
        let pos = self.categories.iter().position(|c| c == value)?;
        Some(
            (1..self.categories.len())
                .map(|i| if i == pos { 1.0 } else { 0.0 })
                .collect(),
        )
    }
}

/// Drop-first one-hot encoder over one or more categorical columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub columns: Vec<EncodedColumn>,
    #[serde(default)]
    pub handle_unknown: UnknownCategory,
}

impl OneHotEncoder {
    /// Fit vocabularies from `(column name, values)` pairs, in the order given.
    pub fn fit(columns: &[(&str, &[String])]) -> Result<Self, EncodeError> {
        let columns = columns
            .iter()
            .map(|(name, values)| {
                let categories: Vec<String> = values
                    .iter()
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                if categories.is_empty() {
                    return Err(EncodeError::NoCategories((*name).to_string()));
                }
                Ok(EncodedColumn {
                    name: (*name).to_string(),
                    categories,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            columns,
            handle_unknown: UnknownCategory::default(),
        })
    }

    /// Check a deserialized encoder: every column needs a non-empty
    /// vocabulary without duplicates.
    pub fn validate(&self) -> Result<(), EncodeError> {
        for column in &self.columns {
            if column.categories.is_empty() {
                return Err(EncodeError::NoCategories(column.name.clone()));
            }
            let distinct: BTreeSet<&String> = column.categories.iter().collect();
            if distinct.len() != column.categories.len() {
                return Err(EncodeError::DuplicateCategory(column.name.clone()));
            }
        }
        Ok(())
    }

    /// Output column names, in encoding order.
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(EncodedColumn::indicator_names)
            .collect()
    }

    fn encode_value(&self, column: &EncodedColumn, value: &str) -> Result<Vec<f64>, EncodeError> {
        match column.encode(value) {
            Some(v) => Ok(v),
            None => match self.handle_unknown {
                UnknownCategory::Reference => {
                    warn!(
                        column = %column.name,
                        value = %value,
                        reference = column.reference().unwrap_or_default(),
                        "Unseen category, encoding as reference level"
                    );
                    Ok(vec![0.0; column.categories.len().saturating_sub(1)])
                }
                UnknownCategory::Error => Err(EncodeError::UnknownCategory {
                    column: column.name.clone(),
                    value: value.to_string(),
                }),
            },
        }
    }

    /// Encode a single record given as `(column, value)` pairs.
    ///
    /// Returns `(feature name, value)` pairs in encoding order. Every fitted
    /// column must be supplied; extra columns are rejected.
    pub fn transform_one(&self, values: &[(&str, &str)]) -> Result<Vec<(String, f64)>, EncodeError> {
        if let Some((name, _)) = values
            .iter()
            .find(|(name, _)| !self.columns.iter().any(|c| c.name == *name))
        {
            return Err(EncodeError::UnknownColumn((*name).to_string()));
        }

        let mut out = Vec::with_capacity(self.feature_names().len());
        for column in &self.columns {
            let value = values
                .iter()
                .find(|(name, _)| *name == column.name)
                .map(|(_, v)| *v)
                .ok_or_else(|| EncodeError::MissingValue(column.name.clone()))?;
            let encoded = self.encode_value(column, value)?;
            out.extend(column.indicator_names().zip(encoded));
        }
        Ok(out)
    }

    /// Encode whole columns (one `Vec` per fitted column, same order as fit).
    /// Returns one encoded row per input row.
    pub fn transform(&self, columns: &[Vec<String>]) -> Result<Vec<Vec<f64>>, EncodeError> {
        if columns.len() != self.columns.len() {
            return Err(EncodeError::LengthMismatch {
                column: "<columns>".to_string(),
                expected: self.columns.len(),
                found: columns.len(),
            });
        }
        let n_rows = columns.first().map_or(0, Vec::len);
        for (fitted, values) in self.columns.iter().zip(columns) {
            if values.len() != n_rows {
                return Err(EncodeError::LengthMismatch {
                    column: fitted.name.clone(),
                    expected: n_rows,
                    found: values.len(),
                });
            }
        }

        (0..n_rows)
            .map(|row| {
                let mut encoded = Vec::new();
                for (fitted, values) in self.columns.iter().zip(columns) {
                    encoded.extend(self.encode_value(fitted, &values[row])?);
                }
                Ok(encoded)
            })
            .collect()
    }
}
