//! Seeded gradient boosting over gbdt decision trees.
//!
//! Row subsampling and per-tree feature sampling draw from a `StdRng`
//! seeded by the caller, so two fits with the same seed, data and
//! hyperparameters produce identical trees. Trees never sample features
//! themselves; a feature left out of a round is masked as missing in that
//! round's copy of the training data, which keeps it out of every split.

use gbdt::config::Loss;
use gbdt::decision_tree::{
    DataVec, DecisionTree, TrainingCache, ValueType, VALUE_TYPE_UNKNOWN,
};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::Hyperparameters;

/// Full sort cache for the tree trainer.
const CACHE_LEVEL: u8 = 2;

/// Additive tree ensemble: `bias + shrinkage * sum(tree(x))`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Booster {
    pub bias: ValueType,
    pub shrinkage: ValueType,
    pub trees: Vec<DecisionTree>,
}

/// Number of items kept when sampling `ratio` of `n`, at least one.
fn sample_size(n: usize, ratio: f64) -> usize {
    ((n as f64 * ratio) as usize).clamp(1, n.max(1))
}

fn new_tree(n_features: usize, hp: &Hyperparameters) -> DecisionTree {
    let mut tree = DecisionTree::new();
    tree.set_feature_size(n_features);
    tree.set_max_depth(hp.max_depth);
    tree.set_min_leaf_size(hp.min_leaf_size);
    tree.set_loss(Loss::SquaredError);
    tree
}

/// Copy of `data` where every feature not in `keep` reads as missing.
fn mask_features(data: &DataVec, keep: &[usize]) -> DataVec {
    data.iter()
        .map(|d| {
            let mut masked = d.clone();
            for (i, v) in masked.feature.iter_mut().enumerate() {
                if !keep.contains(&i) {
                    *v = VALUE_TYPE_UNKNOWN;
                }
            }
            masked
        })
        .collect()
}

impl Booster {
    /// Fit `hp.n_estimators` squared-error trees on `data`.
    ///
    /// `data` must be non-empty with `n_features` values per row; its
    /// `target` fields are overwritten with residuals.
    pub fn fit(data: &mut DataVec, n_features: usize, hp: &Hyperparameters, seed: u64) -> Self {
        let n = data.len();
        let label_sum: f64 = data.iter().map(|d| f64::from(d.label)).sum();
        let bias = (label_sum / n as f64) as ValueType;
        let shrinkage = hp.learning_rate as ValueType;

        let n_rows = sample_size(n, hp.subsample);
        let n_cols = sample_size(n_features, hp.colsample);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut full_cache = TrainingCache::get_cache(n_features, data, CACHE_LEVEL);
        let mut preds: Vec<ValueType> = vec![bias; n];
        let mut trees = Vec::with_capacity(hp.n_estimators);

        for _ in 0..hp.n_estimators {
            for (d, p) in data.iter_mut().zip(&preds) {
                d.target = d.label - p;
            }

            let subset: Vec<usize> = if n_rows < n {
                let mut rows = index::sample(&mut rng, n, n_rows).into_vec();
                rows.sort_unstable();
                rows
            } else {
                (0..n).collect()
            };

            let mut tree = new_tree(n_features, hp);
            if n_cols < n_features {
                let keep = index::sample(&mut rng, n_features, n_cols).into_vec();
                let masked = mask_features(data, &keep);
                let mut cache = TrainingCache::get_cache(n_features, &masked, CACHE_LEVEL);
                tree.fit_n(&masked, &subset, &mut cache);
            } else {
                tree.fit_n(data, &subset, &mut full_cache);
            }

            for (p, step) in preds.iter_mut().zip(tree.predict(data)) {
                *p += shrinkage * step;
            }
            trees.push(tree);
        }

        Self {
            bias,
            shrinkage,
            trees,
        }
    }

    pub fn predict(&self, data: &DataVec) -> Vec<ValueType> {
        let mut out = vec![self.bias; data.len()];
        for tree in &self.trees {
            for (o, step) in out.iter_mut().zip(tree.predict(data)) {
                *o += self.shrinkage * step;
            }
        }
        out
    }
}
