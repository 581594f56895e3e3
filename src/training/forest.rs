//! Bagged ensemble of regression trees.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::data::domain::{FeatureRow, TrainingDataset, N_FEATURES};

use super::domain::Hyperparameters;
use super::tree::{self, Tree, TreeError};

/// Random-forest regressor: the prediction is the mean over all trees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    n_features: u32,
    trees: Vec<Tree>,
}

impl Forest {
    /// Fit `hp.n_estimators` trees, each on its own bootstrap sample.
    ///
    /// A master RNG seeded with `hp.random_state` hands every tree its own
    /// seed, so the result depends only on the dataset and `hp`.
    pub fn fit(dataset: &TrainingDataset, hp: &Hyperparameters) -> Self {
        let rows = dataset.rows();
        let targets = dataset.targets();
        let n = rows.len();
        let mut master = Xoshiro256PlusPlus::seed_from_u64(hp.random_state);

        let trees = (0..hp.n_estimators)
            .map(|_| {
                let mut rng = Xoshiro256PlusPlus::seed_from_u64(master.gen());
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                tree::grow(rows, targets, sample, hp.max_depth as usize, &mut rng)
            })
            .collect();

        Self {
            n_features: N_FEATURES as u32,
            trees,
        }
    }

    /// Assemble a forest without fitting or validating it.
    #[cfg(test)]
    pub(crate) fn from_trees(trees: Vec<Tree>) -> Self {
        Self {
            n_features: N_FEATURES as u32,
            trees,
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features as usize
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> impl Iterator<Item = &Tree> {
        self.trees.iter()
    }

    /// Validate every tree against the forest's feature count.
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.trees.is_empty() {
            return Err(TreeError::Empty);
        }
        self.trees
            .iter()
            .try_for_each(|tree| tree.validate(self.n_features()))
    }

    pub fn predict_row(&self, row: &[f64]) -> Result<f64, TreeError> {
        if row.len() != self.n_features() {
            return Err(TreeError::ShapeMismatch {
                expected: self.n_features(),
                actual: row.len(),
            });
        }
        if self.trees.is_empty() {
            return Err(TreeError::Empty);
        }
        let mut mean = 0.0;
        for (k, tree) in self.trees.iter().enumerate() {
            mean += (tree.predict(row)? - mean) / (k + 1) as f64;
        }
        Ok(mean)
    }

    pub fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, TreeError> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }
}
