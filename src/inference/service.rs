//! Inference service owning the process-wide model.
//!
//! The model is loaded once, during construction, before any request is
//! served. Afterwards it is only ever read, so the service can be shared
//! across request handlers behind an `Arc` without locking.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::common::error::{ErrorCode, PropvalError, PropvalResult};
use crate::common::log::{log_event, Level};
use crate::common::time::Stopwatch;
use crate::training::domain::{ModelArtifact, ModelRepo};

use super::domain::{validate_features, HealthStatus, PredictionResult};

pub struct InferenceService {
    model: Option<ModelArtifact>,
    source: PathBuf,
}

impl InferenceService {
    /// Load the artifact from `repo`. Never fails: an unreadable artifact
    /// leaves the service running with no model so health stays reachable.
    pub fn load(repo: &dyn ModelRepo) -> Self {
        let timer = Stopwatch::start();
        let source = repo.location();
        let model = match repo.get_model() {
            Ok(model) => {
                tracing::info!(
                    path = %source.display(),
                    trees = model.forest.n_trees(),
                    written_by = %model.meta.crate_version,
                    "model loaded"
                );
                log_event(Level::Info, "inference", "load", ErrorCode::Ok, timer.elapsed_ms());
                Some(model)
            }
            Err(err) => {
                tracing::error!(path = %source.display(), error = %err, "model unavailable");
                log_event(Level::Error, "inference", "load", err.code(), timer.elapsed_ms());
                None
            }
        };
        Self { model, source }
    }

    /// Wrap an already loaded (or absent) model.
    pub fn with_model(model: Option<ModelArtifact>) -> Self {
        Self {
            model,
            source: PathBuf::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Path the model was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Healthy iff a model is loaded.
    pub fn health(&self) -> PropvalResult<HealthStatus> {
        if self.is_loaded() {
            Ok(HealthStatus::healthy())
        } else {
            Err(PropvalError::ModelNotLoaded)
        }
    }

    /// Validate `raw`, then run the model on the single row it describes.
    pub fn predict(&self, raw: &Value) -> PropvalResult<PredictionResult> {
        let features = validate_features(raw).map_err(PropvalError::Validation)?;
        let model = self.model.as_ref().ok_or(PropvalError::ModelUnavailable)?;

        let timer = Stopwatch::start();
        let row = features.to_row();
        let price = match model.predict_row(&row) {
            Ok(price) if price.is_finite() => price,
            Ok(price) => {
                log_event(Level::Error, "inference", "predict", ErrorCode::Inference, timer.elapsed_ms());
                return Err(PropvalError::inference(format!("model produced {price}")));
            }
            Err(err) => {
                tracing::error!(error = %err, "prediction failed");
                log_event(Level::Error, "inference", "predict", ErrorCode::Inference, timer.elapsed_ms());
                return Err(PropvalError::inference(err.to_string()));
            }
        };
        tracing::debug!(price, "prediction served");
        Ok(PredictionResult::new(price))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::inference::domain::CURRENCY_UNIT;
    use crate::testing::synthetic_housing;
    use crate::training::domain::Hyperparameters;
    use crate::training::forest::Forest;
    use crate::training::repo_fs::FsModelRepo;
    use crate::training::tree::Tree;

    fn model() -> ModelArtifact {
        let ds = synthetic_housing(200, 12);
        let hp = Hyperparameters::new(5, 5, 42).unwrap();
        ModelArtifact::new(Forest::fit(&ds, &hp), hp, ds.fingerprint(), ds.len())
    }

    fn example() -> Value {
        json!({
            "MedInc": 3.5, "HouseAge": 30.0, "AveRooms": 5.0, "AveBedrms": 1.1,
            "Population": 1500.0, "AveOccup": 3.0, "Latitude": 34.0, "Longitude": -118.0
        })
    }

    #[test]
    fn predicts_a_finite_price_with_unit() {
        let svc = InferenceService::with_model(Some(model()));
        let out = svc.predict(&example()).unwrap();
        assert!(out.predicted_price.is_finite());
        assert_eq!(out.currency_unit, CURRENCY_UNIT);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let svc = InferenceService::with_model(Some(model()));
        let a = svc.predict(&example()).unwrap();
        let b = svc.predict(&example()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn validation_runs_before_model_check() {
        let svc = InferenceService::with_model(None);
        let err = svc.predict(&json!({"MedInc": 1.0})).unwrap_err();
        assert!(matches!(err, PropvalError::Validation(_)));
    }

    #[test]
    fn valid_input_without_model_is_unavailable() {
        let svc = InferenceService::with_model(None);
        let err = svc.predict(&example()).unwrap_err();
        assert!(matches!(err, PropvalError::ModelUnavailable));
    }

    #[test]
    fn model_fault_becomes_prediction_failed() {
        let broken = ModelArtifact::new(
            Forest::from_trees(vec![Tree::self_loop()]),
            Hyperparameters::default(),
            0,
            1,
        );
        let svc = InferenceService::with_model(Some(broken));
        let err = svc.predict(&example()).unwrap_err();
        assert!(matches!(err, PropvalError::Inference(_)));
        assert!(err.to_string().starts_with("Prediction failed:"), "{err}");
    }

    #[test]
    fn health_tracks_model_presence() {
        assert_eq!(
            InferenceService::with_model(Some(model())).health().unwrap(),
            HealthStatus::healthy()
        );
        assert!(matches!(
            InferenceService::with_model(None).health(),
            Err(PropvalError::ModelNotLoaded)
        ));
    }

    #[test]
    fn missing_artifact_starts_without_model() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let svc = InferenceService::load(&FsModelRepo::new(tmp.path(), "none.pkl"));
        assert!(!svc.is_loaded());
        assert_eq!(svc.source(), tmp.path().join("none.pkl").as_path());
    }

    #[test]
    fn corrupt_artifact_starts_without_model() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        std::fs::write(tmp.path().join("m.pkl"), b"PVAL\x01\x00garbage").unwrap();
        let svc = InferenceService::load(&FsModelRepo::new(tmp.path(), "m.pkl"));
        assert!(!svc.is_loaded());
    }
}
