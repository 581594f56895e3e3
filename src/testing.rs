//! Deterministic synthetic housing data for unit and integration tests.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::data::domain::{FeatureRow, TrainingDataset};

/// Generate `n` districts whose price depends mostly on income and location.
///
/// Same `(n, seed)` always yields the same dataset.
pub fn synthetic_housing(n: usize, seed: u64) -> TrainingDataset {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut rows: Vec<FeatureRow> = Vec::with_capacity(n);
    let mut targets = Vec::with_capacity(n);

    for _ in 0..n {
        let med_inc: f64 = rng.gen_range(0.5..15.0);
        let house_age: f64 = rng.gen_range(1.0..52.0);
        let ave_rooms: f64 = rng.gen_range(2.0..9.0);
        let ave_bedrms: f64 = rng.gen_range(0.8..1.5);
        let population: f64 = rng.gen_range(100.0..5000.0);
        let ave_occup: f64 = rng.gen_range(1.5..5.0);
        let latitude: f64 = rng.gen_range(32.5..42.0);
        let longitude: f64 = rng.gen_range(-124.3..-114.3);

        let coastal = if longitude < -121.0 { 0.8 } else { 0.0 };
        let price = 0.45 * med_inc + coastal + 0.01 * house_age - 0.05 * ave_occup
            + rng.gen_range(-0.2..0.2);

        rows.push([
            med_inc, house_age, ave_rooms, ave_bedrms, population, ave_occup, latitude, longitude,
        ]);
        targets.push(price);
    }

    TrainingDataset::new(rows, targets).expect("synthetic rows are finite and non-empty")
}
