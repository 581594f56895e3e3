//! Filesystem-backed dataset source reading the housing table from CSV.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::common::error::{PropvalError, PropvalResult};

use super::domain::{DatasetSource, FeatureRow, TrainingDataset, FEATURE_NAMES, N_FEATURES, TARGET_COLUMNS};

/// CSV file with a header naming the eight features and one target column.
pub struct CsvDatasetSource {
    path: PathBuf,
}

/// Position of every expected column inside a CSV record.
#[derive(Debug)]
struct ColumnMap {
    features: [usize; N_FEATURES],
    target: usize,
}

impl CsvDatasetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> PropvalResult<Self> {
        let mut features = [None; N_FEATURES];
        let mut target = None;

        for (idx, raw) in headers.iter().enumerate() {
            let name = raw.trim();
            if let Some(slot) = FEATURE_NAMES.iter().position(|f| *f == name) {
                if features[slot].replace(idx).is_some() {
                    return Err(PropvalError::data(format!("duplicate column {name:?}")));
                }
            } else if TARGET_COLUMNS.contains(&name) {
                if target.replace(idx).is_some() {
                    return Err(PropvalError::data("more than one target column"));
                }
            } else {
                return Err(PropvalError::data(format!("unexpected column {name:?}")));
            }
        }

        let mut resolved = [0usize; N_FEATURES];
        for (slot, found) in features.iter().enumerate() {
            resolved[slot] = found.ok_or_else(|| {
                PropvalError::data(format!("missing column {:?}", FEATURE_NAMES[slot]))
            })?;
        }
        let target = target.ok_or_else(|| {
            PropvalError::data(format!("missing target column (one of {TARGET_COLUMNS:?})"))
        })?;

        Ok(Self {
            features: resolved,
            target,
        })
    }
}

fn parse_cell(record: &csv::StringRecord, idx: usize, line: u64, column: &str) -> PropvalResult<f64> {
    let raw = record
        .get(idx)
        .ok_or_else(|| PropvalError::data(format!("line {line}: missing {column}")))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| PropvalError::data(format!("line {line}: {column}={raw:?} is not a number")))
}

impl DatasetSource for CsvDatasetSource {
    fn load(&self) -> PropvalResult<TrainingDataset> {
        let file = File::open(&self.path)
            .map_err(|err| PropvalError::data(format!("{}: {err}", self.path.display())))?;
        let mut reader = csv::Reader::from_reader(BufReader::new(file));

        let headers = reader
            .headers()
            .map_err(|err| PropvalError::data(format!("{}: {err}", self.path.display())))?
            .clone();
        let columns = ColumnMap::from_headers(&headers)?;

        let mut rows: Vec<FeatureRow> = Vec::new();
        let mut targets = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|err| PropvalError::data(err.to_string()))?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            let mut row = [0.0; N_FEATURES];
            for (slot, &idx) in columns.features.iter().enumerate() {
                row[slot] = parse_cell(&record, idx, line, FEATURE_NAMES[slot])?;
            }
            targets.push(parse_cell(&record, columns.target, line, "target")?);
            rows.push(row);
        }

        TrainingDataset::new(rows, targets)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
