//! Domain types for model training and the persisted artifact.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::common::config::{env_lookup, parse_var};
use crate::common::error::{PropvalError, PropvalResult};
use crate::data::domain::{FeatureRow, FEATURE_NAMES};
use crate::evaluation::domain::Metrics;

use super::forest::Forest;
use super::tree::TreeError;

pub const DEFAULT_N_ESTIMATORS: u32 = 100;
pub const DEFAULT_MAX_DEPTH: u32 = 10;
pub const DEFAULT_RANDOM_STATE: u64 = 42;

/// Training configuration, fixed for the whole run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Number of trees in the forest.
    pub n_estimators: u32,
    /// Maximum depth of each tree.
    pub max_depth: u32,
    /// Seeds the split, the bootstrap samples and the feature order.
    pub random_state: u64,
}

impl Hyperparameters {
    pub fn new(n_estimators: u32, max_depth: u32, random_state: u64) -> PropvalResult<Self> {
        if n_estimators == 0 {
            return Err(PropvalError::config("N_ESTIMATORS must be at least 1"));
        }
        if max_depth == 0 {
            return Err(PropvalError::config("MAX_DEPTH must be at least 1"));
        }
        Ok(Self {
            n_estimators,
            max_depth,
            random_state,
        })
    }

    /// Read `N_ESTIMATORS`, `MAX_DEPTH` and `RANDOM_STATE` from the environment.
    pub fn from_env() -> PropvalResult<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> PropvalResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::new(
            parse_var(&lookup, "N_ESTIMATORS", DEFAULT_N_ESTIMATORS)?,
            parse_var(&lookup, "MAX_DEPTH", DEFAULT_MAX_DEPTH)?,
            parse_var(&lookup, "RANDOM_STATE", DEFAULT_RANDOM_STATE)?,
        )
    }
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_depth: DEFAULT_MAX_DEPTH,
            random_state: DEFAULT_RANDOM_STATE,
        }
    }
}

/// Provenance stored next to the forest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Column order the forest was trained on.
    pub feature_names: Vec<String>,
    pub hyperparameters: Hyperparameters,
    pub dataset_fingerprint: u64,
    pub n_train_rows: u64,
    /// Version of the crate that wrote the artifact.
    pub crate_version: String,
}

/// Serialized predictor handed from training to serving.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub meta: ArtifactMeta,
    pub forest: Forest,
}

impl ModelArtifact {
    pub fn new(forest: Forest, hyperparameters: Hyperparameters, dataset_fingerprint: u64, n_train_rows: usize) -> Self {
        Self {
            meta: ArtifactMeta {
                feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
                hyperparameters,
                dataset_fingerprint,
                n_train_rows: n_train_rows as u64,
                crate_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            forest,
        }
    }

    /// True when the stored column order is exactly the serving schema.
    pub fn matches_schema(&self) -> bool {
        self.meta.feature_names.iter().map(String::as_str).eq(FEATURE_NAMES)
    }

    pub fn predict_row(&self, row: &FeatureRow) -> Result<f64, TreeError> {
        self.forest.predict_row(row)
    }
}

/// What an operator sees after a training run.
#[derive(Clone, Debug)]
pub struct TrainReport {
    pub metrics: Metrics,
    pub artifact_path: PathBuf,
    pub n_train: usize,
    pub n_test: usize,
    pub dataset_fingerprint: u64,
    pub duration_ms: u128,
}

/// Repository contract for model artifacts.
pub trait ModelRepo {
    /// Persist `artifact`, replacing any previous one atomically.
    fn put_model(&self, artifact: &ModelArtifact) -> PropvalResult<PathBuf>;
    fn get_model(&self) -> PropvalResult<ModelArtifact>;
    /// Where the artifact lives, for logs.
    fn location(&self) -> PathBuf;
}
