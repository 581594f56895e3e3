//! Metric calculators for regression predictions.

use crate::common::error::{PropvalError, PropvalResult};

use super::domain::Metrics;

pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let sum: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(y, p)| (y - p) * (y - p))
        .sum();
    sum / y_true.len() as f64
}

/// `1 - SS_res / SS_tot`.
///
/// A constant `y_true` has no variance to explain: the score is 1.0 for a
/// perfect prediction and 0.0 otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(y, p)| (y - p) * (y - p))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|y| (y - mean) * (y - mean)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Compute [`Metrics`] for predictions against held-out targets.
pub fn evaluate(y_true: &[f64], y_pred: &[f64]) -> PropvalResult<Metrics> {
    if y_true.len() != y_pred.len() {
        return Err(PropvalError::inference(format!(
            "{} targets but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(PropvalError::data("no held-out rows to evaluate"));
    }
    Ok(Metrics {
        mse: mean_squared_error(y_true, y_pred),
        r2: r2_score(y_true, y_pred),
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn perfect_prediction() {
        let y = [1.0, 2.0, 3.0];
        let m = evaluate(&y, &y).unwrap();
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.r2, 1.0);
    }

    #[test]
    fn known_values() {
        let y = [3.0, -0.5, 2.0, 7.0];
        let p = [2.5, 0.0, 2.0, 8.0];
        assert_abs_diff_eq!(mean_squared_error(&y, &p), 0.375, epsilon = 1e-12);
        assert_abs_diff_eq!(r2_score(&y, &p), 0.948_608_137_044_967_9, epsilon = 1e-12);
    }

    #[test]
    fn predicting_the_mean_scores_zero() {
        let y = [1.0, 2.0, 3.0, 4.0];
        let p = [2.5; 4];
        assert_abs_diff_eq!(r2_score(&y, &p), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn constant_targets() {
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 3.0]), 0.0);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        assert!(evaluate(&[1.0, 2.0], &[1.0]).is_err());
        assert!(evaluate(&[], &[]).is_err());
    }
}
