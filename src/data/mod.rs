//! Data domain: the feature schema, dataset acquisition and partitioning.

pub mod domain;
pub mod repo_fs;
pub mod repo_http;
pub mod service;

pub use domain::{DatasetSource, FeatureVector, TrainingDataset, FEATURE_NAMES, N_FEATURES};
pub use repo_fs::CsvDatasetSource;
pub use repo_http::HttpDatasetSource;
