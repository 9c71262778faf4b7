//! K-fold cross-validation over contiguous, unshuffled folds.

use rayon::prelude::*;
use tracing::debug;

use super::{ModelError, NpvRegressor, Scoring};
use crate::config::Hyperparameters;

/// Contiguous `(train, validation)` index pairs for `k` folds.
///
/// The first `n % k` folds hold one extra sample.
pub fn kfold_indices(n: usize, k: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>, ModelError> {
    if k < 2 || n < k {
        return Err(ModelError::TooFewSamples {
            samples: n,
            folds: k,
        });
    }

    let base = n / k;
    let extra = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = base + usize::from(fold < extra);
        let end = start + size;
        let validation: Vec<usize> = (start..end).collect();
        let train: Vec<usize> = (0..start).chain(end..n).collect();
        folds.push((train, validation));
        start = end;
    }
    Ok(folds)
}

/// Score a fresh model on each fold. Folds are fitted in parallel; scores are
/// returned in fold order. Every fold model uses the same `random_state`.
pub fn cross_validate(
    x: &[Vec<f64>],
    y: &[f64],
    feature_names: &[String],
    hyperparameters: &Hyperparameters,
    folds: usize,
    scoring: Scoring,
    random_state: u64,
) -> Result<Vec<f64>, ModelError> {
    if x.len() != y.len() {
        return Err(ModelError::LengthMismatch {
            features: x.len(),
            targets: y.len(),
        });
    }

    kfold_indices(x.len(), folds)?
        .into_par_iter()
        .enumerate()
        .map(|(fold, (train_idx, val_idx))| {
            let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| x[i].clone()).collect();
            let y_train: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();
            let x_val: Vec<Vec<f64>> = val_idx.iter().map(|&i| x[i].clone()).collect();
            let y_val: Vec<f64> = val_idx.iter().map(|&i| y[i]).collect();

            let model = NpvRegressor::fit(
                &x_train,
                &y_train,
                feature_names.to_vec(),
                hyperparameters,
                random_state,
            )?;
            let score = scoring.score(&y_val, &model.predict(&x_val)?);
            debug!(fold, score, scoring = %scoring, "CV fold scored");
            Ok(score)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kfold_sizes_and_order() {
        let folds = kfold_indices(11, 3).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|(_, v)| v.len()).collect();
        assert_eq!(sizes, vec![4, 4, 3]);
        assert_eq!(folds[0].1, vec![0, 1, 2, 3]);
        assert_eq!(folds[1].0, vec![0, 1, 2, 3, 8, 9, 10]);
    }

    #[test]
    fn test_kfold_every_sample_validated_once() {
        let folds = kfold_indices(20, 5).unwrap();
        let mut seen: Vec<usize> = folds.into_iter().flat_map(|(_, v)| v).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_more_folds_than_samples_rejected() {
        assert!(matches!(
            kfold_indices(3, 5),
            Err(ModelError::TooFewSamples { samples: 3, folds: 5 })
        ));
    }

    #[test]
    fn test_cross_validate_returns_one_score_per_fold() {
        let x: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..30).map(|i| 3.0 * i as f64).collect();
        let hp = Hyperparameters {
            n_estimators: 20,
            ..Hyperparameters::default()
        };
        let scores = cross_validate(
            &x,
            &y,
            &["x".to_string()],
            &hp,
            3,
            Scoring::NegMeanAbsoluteError,
            42,
        )
        .unwrap();
        assert_eq!(scores.len(), 3);
        assert!(scores.iter().all(|s| s.is_finite() && *s <= 0.0));
    }

    #[test]
    fn test_subsampled_cross_validation_is_reproducible() {
        let x: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64, (i % 4) as f64]).collect();
        let y: Vec<f64> = x.iter().map(|r| 3.0 * r[0] - r[1]).collect();
        let hp = Hyperparameters {
            n_estimators: 20,
            subsample: 0.7,
            ..Hyperparameters::default()
        };
        let names = ["a".to_string(), "b".to_string()];
        let first = cross_validate(&x, &y, &names, &hp, 3, Scoring::R2, 42).unwrap();
        let second = cross_validate(&x, &y, &names, &hp, 3, Scoring::R2, 42).unwrap();
        assert_eq!(first, second);
    }
}
