//! Core dataset definitions and contracts.
//!
//! The feature schema lives here and nowhere else: the CSV loader, the
//! trainer, the artifact header and the request validator all read
//! [`FEATURE_NAMES`], which keeps training-time and serving-time column
//! order identical.

use serde::Serialize;

use crate::common::error::{PropvalError, PropvalResult};
use crate::common::ids::Fingerprint;

/// Number of input features.
pub const N_FEATURES: usize = 8;

/// Feature column names in model column order.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "MedInc",
    "HouseAge",
    "AveRooms",
    "AveBedrms",
    "Population",
    "AveOccup",
    "Latitude",
    "Longitude",
];

/// Accepted names for the target column.
pub const TARGET_COLUMNS: [&str; 2] = ["MedHouseVal", "PRICE"];

/// One feature row in model column order.
pub type FeatureRow = [f64; N_FEATURES];

/// The eight housing features of a single district.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeatureVector {
    /// Median income in the district, in tens of thousands of USD.
    pub med_inc: f64,
    /// Median house age in years.
    pub house_age: f64,
    /// Average number of rooms per household.
    pub ave_rooms: f64,
    /// Average number of bedrooms per household.
    pub ave_bedrms: f64,
    /// District population.
    pub population: f64,
    /// Average number of household members.
    pub ave_occup: f64,
    /// District latitude in degrees.
    pub latitude: f64,
    /// District longitude in degrees.
    pub longitude: f64,
}

impl FeatureVector {
    /// Arrange the fields in [`FEATURE_NAMES`] order.
    pub fn to_row(&self) -> FeatureRow {
        [
            self.med_inc,
            self.house_age,
            self.ave_rooms,
            self.ave_bedrms,
            self.population,
            self.ave_occup,
            self.latitude,
            self.longitude,
        ]
    }

    pub fn from_row(row: FeatureRow) -> Self {
        let [med_inc, house_age, ave_rooms, ave_bedrms, population, ave_occup, latitude, longitude] =
            row;
        Self {
            med_inc,
            house_age,
            ave_rooms,
            ave_bedrms,
            population,
            ave_occup,
            latitude,
            longitude,
        }
    }

    /// Documentation example used by the OpenAPI document.
    pub fn example() -> Self {
        Self::from_row([3.5, 30.0, 5.0, 1.1, 1500.0, 3.0, 34.0, -118.0])
    }
}

/// Ordered table of feature rows and their targets.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingDataset {
    rows: Vec<FeatureRow>,
    targets: Vec<f64>,
}

impl TrainingDataset {
    /// Build a dataset, rejecting empty, ragged or non-finite input.
    pub fn new(rows: Vec<FeatureRow>, targets: Vec<f64>) -> PropvalResult<Self> {
        if rows.len() != targets.len() {
            return Err(PropvalError::data(format!(
                "{} feature rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        if rows.is_empty() {
            return Err(PropvalError::data("dataset is empty"));
        }
        for (idx, (row, target)) in rows.iter().zip(&targets).enumerate() {
            if let Some(col) = row.iter().position(|v| !v.is_finite()) {
                return Err(PropvalError::data(format!(
                    "row {idx}: {} is not finite",
                    FEATURE_NAMES[col]
                )));
            }
            if !target.is_finite() {
                return Err(PropvalError::data(format!("row {idx}: target is not finite")));
            }
        }
        Ok(Self { rows, targets })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Copy the rows at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            rows: indices.iter().map(|&i| self.rows[i]).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }

    /// Order-sensitive hash over every feature and target bit pattern.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Fingerprint::new();
        for (row, target) in self.rows.iter().zip(&self.targets) {
            for value in row {
                hasher.update_f64(*value);
            }
            hasher.update_f64(*target);
        }
        hasher.finish()
    }
}

/// Anything that can hand over a complete training dataset.
pub trait DatasetSource {
    fn load(&self) -> PropvalResult<TrainingDataset>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

impl DatasetSource for TrainingDataset {
    fn load(&self) -> PropvalResult<TrainingDataset> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory ({} rows)", self.len())
    }
}
