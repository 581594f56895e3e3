//! Service layer orchestrating dataset acquisition, fitting, evaluation and persistence.

use crate::common::error::{ErrorCode, PropvalError, PropvalResult};
use crate::common::ids;
use crate::common::log::{log_event, Level};
use crate::common::time::Stopwatch;
use crate::data::domain::{DatasetSource, TrainingDataset};
use crate::data::service::{self as data_service, TEST_FRACTION};
use crate::evaluation::domain::Metrics;
use crate::evaluation::service as evaluation;

use super::artifact::ArtifactError;
use super::domain::{Hyperparameters, ModelArtifact, ModelRepo, TrainReport};
use super::forest::Forest;

/// Split, fit on the training subset, and score on the held-out subset.
///
/// Pure with respect to its inputs: identical dataset and `hp` give an
/// identical artifact and identical metrics.
pub fn train(dataset: &TrainingDataset, hp: &Hyperparameters) -> PropvalResult<(ModelArtifact, Metrics)> {
    let (train_set, test_set) = data_service::train_test_split(dataset, TEST_FRACTION, hp.random_state)?;

    tracing::info!(
        n_estimators = hp.n_estimators,
        max_depth = hp.max_depth,
        random_state = hp.random_state,
        n_train = train_set.len(),
        n_test = test_set.len(),
        "training random forest"
    );
    let forest = Forest::fit(&train_set, hp);
    forest.validate().map_err(ArtifactError::InvalidModel)?;

    let predictions = forest
        .predict(test_set.rows())
        .map_err(|err| PropvalError::inference(err.to_string()))?;
    let metrics = evaluation::evaluate(test_set.targets(), &predictions)?;

    let artifact = ModelArtifact::new(forest, *hp, dataset.fingerprint(), train_set.len());
    Ok((artifact, metrics))
}

/// Full offline job: acquire data, train, and atomically replace the artifact.
///
/// Nothing is written unless every earlier step succeeded.
pub fn run(source: &dyn DatasetSource, hp: &Hyperparameters, repo: &dyn ModelRepo) -> PropvalResult<TrainReport> {
    let timer = Stopwatch::start();
    let dataset = data_service::acquire(source)?;

    let (artifact, metrics) = match train(&dataset, hp) {
        Ok(out) => out,
        Err(err) => {
            log_event(Level::Error, "training", "fit", err.code(), timer.elapsed_ms());
            return Err(err);
        }
    };
    tracing::info!(
        mse = metrics.mse,
        r2 = metrics.r2,
        dataset = %ids::to_hex(artifact.meta.dataset_fingerprint),
        "model trained"
    );

    let artifact_path = match repo.put_model(&artifact) {
        Ok(path) => path,
        Err(err) => {
            log_event(Level::Error, "training", "persist", err.code(), timer.elapsed_ms());
            return Err(err);
        }
    };
    tracing::info!(path = %artifact_path.display(), "model saved");

    let duration_ms = timer.elapsed_ms();
    log_event(Level::Info, "training", "run", ErrorCode::Ok, duration_ms);

    let n_train = artifact.meta.n_train_rows as usize;
    Ok(TrainReport {
        metrics,
        artifact_path,
        n_train,
        n_test: dataset.len() - n_train,
        dataset_fingerprint: artifact.meta.dataset_fingerprint,
        duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::PathBuf;

    use super::*;
    use crate::testing::synthetic_housing;

    /// Records writes instead of touching the filesystem.
    #[derive(Default)]
    struct RecordingRepo {
        writes: Cell<usize>,
    }

    impl ModelRepo for RecordingRepo {
        fn put_model(&self, _: &ModelArtifact) -> PropvalResult<PathBuf> {
            self.writes.set(self.writes.get() + 1);
            Ok(self.location())
        }
        fn get_model(&self) -> PropvalResult<ModelArtifact> {
            Err(PropvalError::ModelUnavailable)
        }
        fn location(&self) -> PathBuf {
            PathBuf::from("memory://model")
        }
    }

    struct Unreachable;

    impl DatasetSource for Unreachable {
        fn load(&self) -> PropvalResult<TrainingDataset> {
            Err(PropvalError::data("network unreachable"))
        }
        fn describe(&self) -> String {
            "unreachable".into()
        }
    }

    fn hp() -> Hyperparameters {
        Hyperparameters::new(10, 6, 42).unwrap()
    }

    #[test]
    fn same_inputs_same_artifact_and_metrics() {
        let ds = synthetic_housing(400, 4);
        let (a_model, a_metrics) = train(&ds, &hp()).unwrap();
        let (b_model, b_metrics) = train(&ds, &hp()).unwrap();
        assert_eq!(a_model, b_model);
        assert_eq!(a_metrics, b_metrics);
    }

    #[test]
    fn held_out_metrics_are_sensible() {
        let ds = synthetic_housing(600, 8);
        let (model, metrics) = train(&ds, &hp()).unwrap();
        assert!(metrics.mse.is_finite() && metrics.mse >= 0.0);
        assert!(metrics.r2 > 0.5, "r2 = {}", metrics.r2);
        assert_eq!(model.meta.n_train_rows, 480);
        assert_eq!(model.forest.n_trees(), 10);
    }

    #[test]
    fn run_reports_split_sizes() {
        let ds = synthetic_housing(250, 1);
        let repo = RecordingRepo::default();
        let report = run(&ds, &hp(), &repo).unwrap();
        assert_eq!(report.n_train, 200);
        assert_eq!(report.n_test, 50);
        assert_eq!(report.dataset_fingerprint, ds.fingerprint());
        assert_eq!(repo.writes.get(), 1);
    }

    #[test]
    fn extreme_targets_still_give_a_loadable_artifact() {
        let base = synthetic_housing(60, 2);
        let targets: Vec<f64> = base
            .targets()
            .iter()
            .enumerate()
            .map(|(i, &y)| if i % 2 == 0 { f64::MAX } else { y })
            .collect();
        let ds = TrainingDataset::new(base.rows().to_vec(), targets).unwrap();
        let (model, _) = train(&ds, &Hyperparameters::new(3, 4, 42).unwrap()).unwrap();
        let bytes = crate::training::artifact::encode(&model).unwrap();
        assert_eq!(crate::training::artifact::decode(&bytes).unwrap(), model);
    }

    #[test]
    fn data_failure_writes_nothing() {
        let repo = RecordingRepo::default();
        let err = run(&Unreachable, &hp(), &repo).unwrap_err();
        assert!(matches!(err, PropvalError::DataAcquisition(_)));
        assert_eq!(repo.writes.get(), 0);
    }
}
