//! Seeded train/test partitioning and the persisted processed split.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::PreprocessError;

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n_rows` with `seed` and hold out `ceil(test_size * n_rows)`
/// rows for testing. Both partitions must end up non-empty.
pub fn train_test_split(
    n_rows: usize,
    test_size: f64,
    seed: u64,
) -> Result<SplitIndices, PreprocessError> {
    let n_test = (test_size * n_rows as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_rows {
        return Err(PreprocessError::TooFewRows { rows: n_rows, test_size });
    }

    let mut permutation: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    permutation.shuffle(&mut rng);

    let train = permutation.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: permutation,
    })
}

/// Encoded train/test partitions written by the preprocess stage.
///
/// Read-only after creation; downstream stages load it from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedSplit {
    /// Column order of every row in `x_train` / `x_test`
    pub feature_names: Vec<String>,
    pub x_train: Vec<Vec<f64>>,
    pub y_train: Vec<f64>,
    pub x_test: Vec<Vec<f64>>,
    pub y_test: Vec<f64>,
    pub created_at: DateTime<Utc>,
}

impl ProcessedSplit {
    /// Partition encoded rows and targets by `indices`.
    pub fn from_indices(
        feature_names: Vec<String>,
        rows: &[Vec<f64>],
        targets: &[f64],
        indices: &SplitIndices,
    ) -> Self {
        let pick_rows = |idx: &[usize]| idx.iter().map(|&i| rows[i].clone()).collect();
        let pick_targets = |idx: &[usize]| idx.iter().map(|&i| targets[i]).collect();
        Self {
            feature_names,
            x_train: pick_rows(&indices.train),
            y_train: pick_targets(&indices.train),
            x_test: pick_rows(&indices.test),
            y_test: pick_targets(&indices.test),
            created_at: Utc::now(),
        }
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_sizes_round_test_up() {
        let split = train_test_split(11, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 8);
    }

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let split = train_test_split(50, 0.2, 7).unwrap();
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        assert_eq!(
            train_test_split(40, 0.25, 42).unwrap(),
            train_test_split(40, 0.25, 42).unwrap()
        );
        assert_ne!(
            train_test_split(40, 0.25, 42).unwrap(),
            train_test_split(40, 0.25, 43).unwrap()
        );
    }

    #[test]
    fn test_single_row_cannot_split() {
        assert!(matches!(
            train_test_split(1, 0.2, 42),
            Err(PreprocessError::TooFewRows { rows: 1, .. })
        ));
    }

    #[test]
    fn test_from_indices_keeps_rows_aligned() {
        let rows = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let targets = vec![10.0, 11.0, 12.0, 13.0];
        let indices = SplitIndices {
            train: vec![3, 0],
            test: vec![1, 2],
        };
        let split = ProcessedSplit::from_indices(vec!["x".into()], &rows, &targets, &indices);
        assert_eq!(split.x_train, vec![vec![3.0], vec![0.0]]);
        assert_eq!(split.y_train, vec![13.0, 10.0]);
        assert_eq!(split.y_test, vec![11.0, 12.0]);
    }
}
