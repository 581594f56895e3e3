//! Training domain: hyperparameters, the random-forest learner, and the
//! artifact that hands a fitted model to the inference service.

pub mod artifact;
pub mod domain;
pub mod forest;
pub mod repo_fs;
pub mod service;
pub mod tree;

pub use artifact::ArtifactError;
pub use domain::{Hyperparameters, ModelArtifact, ModelRepo, TrainReport};
pub use repo_fs::FsModelRepo;
