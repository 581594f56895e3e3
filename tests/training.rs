use std::fs;
use std::io::Write;

use propval::common::PropvalError;
use propval::data::{CsvDatasetSource, FEATURE_NAMES};
use propval::inference::InferenceService;
use propval::testing::synthetic_housing;
use propval::training::{self, FsModelRepo, Hyperparameters, ModelRepo};
use serde_json::json;

fn hp() -> Hyperparameters {
    Hyperparameters::new(8, 6, 42).unwrap()
}

/// Write a synthetic dataset as CSV with the target in the first column.
fn write_csv(path: &std::path::Path, n: usize, seed: u64) {
    let ds = synthetic_housing(n, seed);
    let mut out = fs::File::create(path).unwrap();
    writeln!(out, "MedHouseVal,{}", FEATURE_NAMES.join(",")).unwrap();
    for (row, target) in ds.rows().iter().zip(ds.targets()) {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(out, "{target},{}", cells.join(",")).unwrap();
    }
}

#[test]
fn csv_to_artifact_to_prediction() {
    let tmp = tempfile::tempdir().unwrap();
    let csv_path = tmp.path().join("housing.csv");
    write_csv(&csv_path, 400, 3);

    let repo = FsModelRepo::new(tmp.path().join("models"), "house_price_model.pkl");
    let report = training::service::run(&CsvDatasetSource::new(&csv_path), &hp(), &repo).unwrap();

    assert_eq!(report.n_test, 80);
    assert_eq!(report.n_train, 320);
    assert!(report.metrics.mse >= 0.0);
    assert!(report.metrics.r2 > 0.5, "r2 = {}", report.metrics.r2);
    assert!(report.artifact_path.exists());

    let svc = InferenceService::load(&repo);
    assert!(svc.is_loaded());
    let out = svc
        .predict(&json!({
            "MedInc": 3.5, "HouseAge": 30.0, "AveRooms": 5.0, "AveBedrms": 1.1,
            "Population": 1500.0, "AveOccup": 3.0, "Latitude": 34.0, "Longitude": -118.0
        }))
        .unwrap();
    assert!(out.predicted_price.is_finite());
}

#[test]
fn same_seed_gives_identical_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let csv_path = tmp.path().join("housing.csv");
    write_csv(&csv_path, 200, 9);
    let source = CsvDatasetSource::new(&csv_path);

    let a = FsModelRepo::new(tmp.path(), "a.pkl");
    let b = FsModelRepo::new(tmp.path(), "b.pkl");
    let ra = training::service::run(&source, &hp(), &a).unwrap();
    let rb = training::service::run(&source, &hp(), &b).unwrap();

    assert_eq!(ra.metrics, rb.metrics);
    assert_eq!(fs::read(&ra.artifact_path).unwrap(), fs::read(&rb.artifact_path).unwrap());
    assert_eq!(a.get_model().unwrap(), b.get_model().unwrap());
}

#[test]
fn missing_dataset_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let repo = FsModelRepo::new(tmp.path().join("models"), "m.pkl");
    let err = training::service::run(&CsvDatasetSource::new(tmp.path().join("absent.csv")), &hp(), &repo)
        .unwrap_err();

    assert!(matches!(err, PropvalError::DataAcquisition(_)));
    assert!(!repo.location().exists());
}

#[test]
fn retraining_replaces_the_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let csv_path = tmp.path().join("housing.csv");
    write_csv(&csv_path, 150, 1);
    let repo = FsModelRepo::new(tmp.path(), "m.pkl");

    training::service::run(&CsvDatasetSource::new(&csv_path), &hp(), &repo).unwrap();
    let first = repo.get_model().unwrap();

    write_csv(&csv_path, 150, 2);
    training::service::run(&CsvDatasetSource::new(&csv_path), &hp(), &repo).unwrap();
    let second = repo.get_model().unwrap();

    assert_ne!(first.meta.dataset_fingerprint, second.meta.dataset_fingerprint);
    let leftovers: Vec<_> = fs::read_dir(tmp.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().map_or(true, |ext| ext != "pkl" && ext != "csv"))
        .collect();
    assert!(leftovers.is_empty(), "temporary files left behind: {leftovers:?}");
}
