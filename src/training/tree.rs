//! Regression tree storage (structure of arrays) and the variance-reduction grower.
//!
//! Nodes live in flat parallel arrays; node 0 is the root. A node is a leaf
//! when its `left` entry is [`LEAF`]. Children are always allocated after
//! their parent, so a valid tree has `child > node` for every edge, which
//! rules out cycles.

use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::domain::{FeatureRow, N_FEATURES};

/// Child marker for leaf nodes.
pub const LEAF: u32 = u32::MAX;

/// Nodes with fewer samples are never split.
pub const MIN_SAMPLES_SPLIT: usize = 2;

/// Every child of a split keeps at least this many samples.
pub const MIN_SAMPLES_LEAF: usize = 1;

/// Structural faults found while validating or traversing a tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    #[error("tree has no nodes")]
    Empty,

    #[error("node arrays have inconsistent lengths")]
    LengthMismatch,

    #[error("node {node}: child {child} is out of bounds or precedes its parent")]
    BadChild { node: u32, child: u32 },

    #[error("node {node}: feature {feature} is out of range for {n_features} features")]
    FeatureOutOfRange { node: u32, feature: u32, n_features: u32 },

    #[error("node {node}: non-finite split threshold or leaf value")]
    NonFinite { node: u32 },

    #[error("expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
}

/// Immutable regression tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    split_feature: Vec<u32>,
    threshold: Vec<f64>,
    left: Vec<u32>,
    right: Vec<u32>,
    value: Vec<f64>,
}

impl Tree {
    fn with_root(value: f64) -> Self {
        let mut tree = Self {
            split_feature: Vec::new(),
            threshold: Vec::new(),
            left: Vec::new(),
            right: Vec::new(),
            value: Vec::new(),
        };
        tree.push_leaf(value);
        tree
    }

    fn push_leaf(&mut self, value: f64) -> u32 {
        let id = self.value.len() as u32;
        self.split_feature.push(0);
        self.threshold.push(0.0);
        self.left.push(LEAF);
        self.right.push(LEAF);
        self.value.push(value);
        id
    }

    fn set_split(&mut self, node: u32, feature: usize, threshold: f64, left: u32, right: u32) {
        let n = node as usize;
        self.split_feature[n] = feature as u32;
        self.threshold[n] = threshold;
        self.left[n] = left;
        self.right[n] = right;
    }

    pub fn n_nodes(&self) -> usize {
        self.value.len()
    }

    #[inline]
    pub fn is_leaf(&self, node: u32) -> bool {
        self.left[node as usize] == LEAF
    }

    pub fn n_leaves(&self) -> usize {
        self.left.iter().filter(|&&l| l == LEAF).count()
    }

    /// Length of the longest root-to-leaf path, in edges.
    pub fn depth(&self) -> usize {
        let mut depth = vec![0usize; self.n_nodes()];
        let mut max = 0;
        for node in 0..self.n_nodes() {
            if !self.is_leaf(node as u32) {
                let d = depth[node] + 1;
                depth[self.left[node] as usize] = d;
                depth[self.right[node] as usize] = d;
                max = max.max(d);
            }
        }
        max
    }

    /// Check every invariant traversal relies on.
    pub fn validate(&self, n_features: usize) -> Result<(), TreeError> {
        let n = self.n_nodes();
        if n == 0 {
            return Err(TreeError::Empty);
        }
        if [self.split_feature.len(), self.threshold.len(), self.left.len(), self.right.len()]
            .iter()
            .any(|&len| len != n)
        {
            return Err(TreeError::LengthMismatch);
        }

        for node in 0..n {
            let id = node as u32;
            if !self.value[node].is_finite() {
                return Err(TreeError::NonFinite { node: id });
            }
            let (left, right) = (self.left[node], self.right[node]);
            if left == LEAF && right == LEAF {
                continue;
            }
            for child in [left, right] {
                if child == LEAF || child as usize >= n || child <= id {
                    return Err(TreeError::BadChild { node: id, child });
                }
            }
            if self.split_feature[node] as usize >= n_features {
                return Err(TreeError::FeatureOutOfRange {
                    node: id,
                    feature: self.split_feature[node],
                    n_features: n_features as u32,
                });
            }
            if !self.threshold[node].is_finite() {
                return Err(TreeError::NonFinite { node: id });
            }
        }
        Ok(())
    }

    /// Walk from the root to a leaf: `x <= threshold` goes left.
    pub fn predict(&self, row: &[f64]) -> Result<f64, TreeError> {
        let n = self.n_nodes();
        if n == 0 {
            return Err(TreeError::Empty);
        }
        let mut node = 0u32;
        loop {
            let idx = node as usize;
            if self.is_leaf(node) {
                return Ok(self.value[idx]);
            }
            let feature = self.split_feature[idx];
            let x = row.get(feature as usize).ok_or(TreeError::FeatureOutOfRange {
                node,
                feature,
                n_features: row.len() as u32,
            })?;
            let next = if *x <= self.threshold[idx] {
                self.left[idx]
            } else {
                self.right[idx]
            };
            if next as usize >= n || next <= node {
                return Err(TreeError::BadChild { node, child: next });
            }
            node = next;
        }
    }
}

#[cfg(test)]
impl Tree {
    /// One split node whose children point back at itself; fails on traversal.
    pub(crate) fn self_loop() -> Self {
        Self {
            split_feature: vec![0],
            threshold: vec![0.0],
            left: vec![0],
            right: vec![0],
            value: vec![1.0],
        }
    }
}

/// Candidate split found by [`best_split`].
#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
}

/// Running mean; stays finite for finite inputs where a plain sum could overflow.
fn mean(targets: &[f64], sample: &[usize]) -> f64 {
    sample
        .iter()
        .enumerate()
        .fold(0.0, |acc, (k, &i)| acc + (targets[i] - acc) / (k + 1) as f64)
}

/// Best squared-error split over all features, or `None` when nothing helps.
///
/// Maximises `sum_l^2 / n_l + sum_r^2 / n_r`, which is equivalent to
/// minimising the children's summed squared error.
fn best_split(
    rows: &[FeatureRow],
    targets: &[f64],
    sample: &[usize],
    rng: &mut Xoshiro256PlusPlus,
) -> Option<Split> {
    let n = sample.len();
    let total: f64 = sample.iter().map(|&i| targets[i]).sum();
    let parent_score = total * total / n as f64;

    let mut features: Vec<usize> = (0..N_FEATURES).collect();
    features.shuffle(rng);

    let mut best: Option<Split> = None;
    let mut best_score = parent_score;
    let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

    for &feature in &features {
        pairs.clear();
        pairs.extend(sample.iter().map(|&i| (rows[i][feature], targets[i])));
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        for i in 0..n - 1 {
            left_sum += pairs[i].1;
            let (x, next_x) = (pairs[i].0, pairs[i + 1].0);
            if x == next_x {
                continue;
            }
            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < MIN_SAMPLES_LEAF || n_right < MIN_SAMPLES_LEAF {
                continue;
            }
            let right_sum = total - left_sum;
            let score = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
            if score > best_score {
                let mut threshold = x + (next_x - x) / 2.0;
                if threshold >= next_x {
                    threshold = x;
                }
                best_score = score;
                best = Some(Split { feature, threshold });
            }
        }
    }

    let gain = best_score - parent_score;
    if gain <= 1e-12 * parent_score.abs().max(1.0) {
        return None;
    }
    best
}

/// Grow one tree on `sample` (indices into `rows`, duplicates allowed).
pub(crate) fn grow(
    rows: &[FeatureRow],
    targets: &[f64],
    sample: Vec<usize>,
    max_depth: usize,
    rng: &mut Xoshiro256PlusPlus,
) -> Tree {
    let mut tree = Tree::with_root(mean(targets, &sample));
    let mut stack = vec![(0u32, sample, 0usize)];

    while let Some((node, sample, depth)) = stack.pop() {
        if depth >= max_depth || sample.len() < MIN_SAMPLES_SPLIT {
            continue;
        }
        let first = targets[sample[0]];
        if sample.iter().all(|&i| targets[i] == first) {
            continue;
        }
        let Some(split) = best_split(rows, targets, &sample, rng) else {
            continue;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| rows[i][split.feature] <= split.threshold);

        let left_id = tree.push_leaf(mean(targets, &left));
        let right_id = tree.push_leaf(mean(targets, &right));
        tree.set_split(node, split.feature, split.threshold, left_id, right_id);

        stack.push((right_id, right, depth + 1));
        stack.push((left_id, left, depth + 1));
    }

    tree
}
