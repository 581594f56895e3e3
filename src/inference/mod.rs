//! Inference domain: request validation, single-row prediction and health.

pub mod domain;
pub mod service;

pub use domain::{HealthStatus, PredictionResult, CURRENCY_UNIT};
pub use service::InferenceService;
