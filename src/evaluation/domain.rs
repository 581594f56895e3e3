//! Evaluation metrics reported after training.

use serde::Serialize;

/// Held-out regression metrics.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Metrics {
    /// Mean squared error.
    pub mse: f64,
    /// Coefficient of determination.
    pub r2: f64,
}
