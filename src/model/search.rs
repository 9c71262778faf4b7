//! Exhaustive hyperparameter grid search scored by k-fold cross-validation.

use rayon::prelude::*;
use tracing::{debug, info};

use super::{cross_validate, metrics, ModelError};
use crate::config::{Hyperparameters, SearchConfig, TrainingConfig};

/// Winning grid point and its fold scores.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub best: Hyperparameters,
    pub cv_scores: Vec<f64>,
    pub best_score: f64,
    /// Grid points evaluated
    pub candidates: usize,
}

fn axis<T: Clone>(values: &[T], base: &T) -> Vec<T> {
    if values.is_empty() {
        vec![base.clone()]
    } else {
        values.to_vec()
    }
}

/// Cartesian product of the grid over `base`. An empty axis keeps the base
/// value. Ordered with `subsample` varying fastest.
pub fn candidates(base: &Hyperparameters, grid: &SearchConfig) -> Vec<Hyperparameters> {
    let mut out = Vec::new();
    for &n_estimators in &axis(&grid.n_estimators, &base.n_estimators) {
        for &max_depth in &axis(&grid.max_depth, &base.max_depth) {
            for &learning_rate in &axis(&grid.learning_rate, &base.learning_rate) {
                for &subsample in &axis(&grid.subsample, &base.subsample) {
                    out.push(Hyperparameters {
                        n_estimators,
                        max_depth,
                        learning_rate,
                        subsample,
                        ..base.clone()
                    });
                }
            }
        }
    }
    out
}

/// Cross-validate every grid point and return the one with the highest mean
/// score. Ties go to the earliest grid point; a NaN mean never wins.
pub fn grid_search(
    x: &[Vec<f64>],
    y: &[f64],
    feature_names: &[String],
    base: &Hyperparameters,
    grid: &SearchConfig,
    training: &TrainingConfig,
    random_state: u64,
) -> Result<SearchOutcome, ModelError> {
    let (folds, scoring) = (training.cv_folds, training.scoring);
    let points = candidates(base, grid);
    info!(candidates = points.len(), folds, scoring = %scoring, "Starting grid search");

    let scored: Vec<(Hyperparameters, Vec<f64>)> = points
        .into_par_iter()
        .map(|hp| {
            let scores = cross_validate(x, y, feature_names, &hp, folds, scoring, random_state)?;
            debug!(?hp, mean = metrics::mean(&scores), "Grid point scored");
            Ok((hp, scores))
        })
        .collect::<Result<_, ModelError>>()?;

    let candidates = scored.len();
    let mut best: Option<(Hyperparameters, Vec<f64>, f64)> = None;
    for (hp, scores) in scored {
        let mean = metrics::mean(&scores);
        let better = match &best {
            None => true,
            Some((_, _, best_mean)) => mean > *best_mean || (best_mean.is_nan() && !mean.is_nan()),
        };
        if better {
            best = Some((hp, scores, mean));
        }
    }

    let (best, cv_scores, best_score) = best.ok_or(ModelError::EmptyGrid)?;
    info!(
        best_score,
        n_estimators = best.n_estimators,
        max_depth = best.max_depth,
        learning_rate = best.learning_rate,
        subsample = best.subsample,
        "Grid search complete"
    );
    Ok(SearchOutcome {
        best,
        cv_scores,
        best_score,
        candidates,
    })
}
