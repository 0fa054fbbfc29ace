// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use xyz_core::{XyzError, stats};

/// Volatility figures for one item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VariationMetrics {
    pub mean: f64,
    pub std: f64,
    pub cv: f64,
    pub variation_value: f64,
}

/// `std / mean * 100`. A zero mean yields `0` when `std` is also zero and
/// `+inf` otherwise.
pub fn coefficient_of_variation(mean: f64, std: f64) -> f64 {
    if mean == 0.0 {
        if std == 0.0 { 0.0 } else { f64::INFINITY }
    } else {
        std / mean * 100.0
    }
}

/// Scores an item from its original series (mean) and its preprocessed
/// series (standard deviation).
pub fn variation_metrics(
    original: &[f64],
    processed: &[f64],
    use_cv_squared: bool,
) -> Result<VariationMetrics, XyzError> {
    let mean = stats::mean(original)
        .ok_or_else(|| XyzError::invalid_input("cannot score an empty series"))?;
    let std = stats::population_std(processed)
        .ok_or_else(|| XyzError::invalid_input("cannot score an empty processed series"))?;

    if !mean.is_finite() {
        return Err(XyzError::numerical_issue(format!(
            "series mean is not finite: {mean}"
        )));
    }
    if !std.is_finite() {
        return Err(XyzError::numerical_issue(format!(
            "processed series std is not finite: {std}"
        )));
    }

    let cv = coefficient_of_variation(mean, std);
    let variation_value = if use_cv_squared { cv * cv } else { cv };
    Ok(VariationMetrics {
        mean,
        std,
        cv,
        variation_value,
    })
}

#[cfg(test)]
mod tests {
    use super::{coefficient_of_variation, variation_metrics};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "actual={actual}, expected={expected}, tol={tol}"
        );
    }

    #[test]
    fn cv_handles_zero_mean() {
        assert_eq!(coefficient_of_variation(0.0, 0.0), 0.0);
        assert_eq!(coefficient_of_variation(0.0, 1.5), f64::INFINITY);
        assert_close(coefficient_of_variation(50.0, 5.0), 10.0, 1e-12);
    }

    #[test]
    fn mean_comes_from_original_and_std_from_processed() {
        let original = [10.0, 10.0, 10.0, 10.0];
        let processed = [-1.0, 1.0, -1.0, 1.0];
        let metrics = variation_metrics(&original, &processed, false)
            .expect("metrics should compute");
        assert_close(metrics.mean, 10.0, 1e-12);
        assert_close(metrics.std, 1.0, 1e-12);
        assert_close(metrics.cv, 10.0, 1e-12);
        assert_close(metrics.variation_value, 10.0, 1e-12);
    }

    #[test]
    fn squared_mode_squares_cv() {
        let series = [8.0, 12.0, 8.0, 12.0];
        let metrics = variation_metrics(&series, &series, true).expect("metrics should compute");
        assert_close(metrics.cv, 20.0, 1e-12);
        assert_close(metrics.variation_value, 400.0, 1e-9);
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let err = variation_metrics(&[1.0, f64::NAN], &[1.0, 2.0], false)
            .expect_err("NaN mean should fail");
        assert_eq!(err.code(), "numerical_issue");
        let err = variation_metrics(&[], &[], false).expect_err("empty should fail");
        assert_eq!(err.code(), "invalid_input");
    }
}
