//! Dataset acquisition and deterministic partitioning.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::common::error::{ErrorCode, PropvalError, PropvalResult};
use crate::common::log::{log_event, Level};
use crate::common::time::Stopwatch;

use super::domain::{DatasetSource, TrainingDataset};

/// Share of rows held out for evaluation.
pub const TEST_FRACTION: f64 = 0.2;

/// Pull the full dataset from `source`, logging how long it took.
pub fn acquire(source: &dyn DatasetSource) -> PropvalResult<TrainingDataset> {
    let timer = Stopwatch::start();
    tracing::info!(source = %source.describe(), "loading dataset");
    match source.load() {
        Ok(dataset) => {
            tracing::info!(rows = dataset.len(), "dataset loaded");
            log_event(Level::Info, "data", "acquire", ErrorCode::Ok, timer.elapsed_ms());
            Ok(dataset)
        }
        Err(err) => {
            log_event(Level::Error, "data", "acquire", err.code(), timer.elapsed_ms());
            Err(err)
        }
    }
}

/// Split into `(train, test)` with `ceil(test_fraction * n)` held-out rows.
///
/// The row permutation depends only on `seed` and the dataset length.
pub fn train_test_split(
    dataset: &TrainingDataset,
    test_fraction: f64,
    seed: u64,
) -> PropvalResult<(TrainingDataset, TrainingDataset)> {
    let n = dataset.len();
    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PropvalError::data(format!(
            "{n} rows cannot be split into non-empty train and test subsets"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    Ok((dataset.subset(train_idx), dataset.subset(test_idx)))
}
