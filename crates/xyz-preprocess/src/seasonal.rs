// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use xyz_core::XyzError;

/// A method that removes a periodic component from a series while keeping
/// its length.
pub trait SeasonalDecomposer {
    fn name(&self) -> &'static str;

    /// Capability check on the data shape; called before
    /// [`SeasonalDecomposer::deseasonalize`].
    fn supports(&self, n: usize, period: usize) -> bool;

    fn deseasonalize(&self, values: &[f64], period: usize) -> Result<Vec<f64>, XyzError>;
}

/// Classical additive decomposition `x = trend + seasonal + residual`,
/// returning `trend + residual`.
///
/// The trend is a centered moving average (a `2 x period` average for even
/// periods), the seasonal profile is the mean-centered per-phase average of
/// the detrended series, and the half-window edges where the trend is
/// undefined are filled from the nearest defined value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassicalAdditive;

impl SeasonalDecomposer for ClassicalAdditive {
    fn name(&self) -> &'static str {
        "classical_additive"
    }

    fn supports(&self, n: usize, period: usize) -> bool {
        period >= 1 && n >= period.saturating_mul(2)
    }

    fn deseasonalize(&self, values: &[f64], period: usize) -> Result<Vec<f64>, XyzError> {
        let n = values.len();
        if !self.supports(n, period) {
            return Err(XyzError::invalid_input(format!(
                "classical decomposition requires period >= 1 and n >= 2*period, got period={period}, n={n}"
            )));
        }

        let trend = centered_trend(values, period);
        let detrended: Vec<f64> = values
            .iter()
            .zip(&trend)
            .map(|(observed, trend_value)| observed - trend_value)
            .collect();
        let seasonal = mean_centered_phase_profile(&detrended, period);

        let mut out: Vec<f64> = (0..n)
            .map(|t| {
                if trend[t].is_nan() {
                    f64::NAN
                } else {
                    values[t] - seasonal[t % period]
                }
            })
            .collect();
        fill_edges_from_nearest(&mut out)?;

        if let Some((idx, value)) = out.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(XyzError::numerical_issue(format!(
                "classical decomposition produced non-finite value {value} at index {idx}"
            )));
        }
        Ok(out)
    }
}

/// Centered moving-average adjustment: every point has
/// `(local window mean - global mean)` subtracted. Series shorter than one
/// period are returned unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MovingAverageAdjustment;

impl SeasonalDecomposer for MovingAverageAdjustment {
    fn name(&self) -> &'static str {
        "moving_average"
    }

    fn supports(&self, n: usize, period: usize) -> bool {
        period >= 1 && n >= period
    }

    fn deseasonalize(&self, values: &[f64], period: usize) -> Result<Vec<f64>, XyzError> {
        let n = values.len();
        if !self.supports(n, period) {
            return Ok(values.to_vec());
        }
        let global_mean = values.iter().sum::<f64>() / n as f64;
        let half = period / 2;
        let out = (0..n)
            .map(|t| {
                let start = t.saturating_sub(half);
                let end = t.saturating_add(half).saturating_add(1).min(n);
                let window = &values[start..end];
                let local_mean = window.iter().sum::<f64>() / window.len() as f64;
                values[t] - (local_mean - global_mean)
            })
            .collect();
        Ok(out)
    }
}

/// Which decomposer produced a deseasonalized series, and why the preferred
/// one was passed over if it was.
#[derive(Clone, Debug, PartialEq)]
pub struct SeasonalOutcome {
    pub values: Vec<f64>,
    pub method: &'static str,
    pub fallback_reason: Option<String>,
}

/// Runs `preferred` when its capability check passes and falls back to
/// `fallback` when it does not or when it returns an error.
pub fn deseasonalize_two_tier(
    values: &[f64],
    period: usize,
    preferred: &dyn SeasonalDecomposer,
    fallback: &dyn SeasonalDecomposer,
) -> Result<SeasonalOutcome, XyzError> {
    let n = values.len();
    let reason = if preferred.supports(n, period) {
        match preferred.deseasonalize(values, period) {
            Ok(out) => {
                return Ok(SeasonalOutcome {
                    values: out,
                    method: preferred.name(),
                    fallback_reason: None,
                });
            }
            Err(err) => format!("{} failed: {err}", preferred.name()),
        }
    } else {
        format!(
            "{} unsupported for n={n}, period={period}",
            preferred.name()
        )
    };

    if !fallback.supports(n, period) {
        return Ok(SeasonalOutcome {
            values: values.to_vec(),
            method: "none",
            fallback_reason: Some(format!(
                "{reason}; {} unsupported for n={n}, period={period}",
                fallback.name()
            )),
        });
    }

    Ok(SeasonalOutcome {
        values: fallback.deseasonalize(values, period)?,
        method: fallback.name(),
        fallback_reason: Some(reason),
    })
}

fn centered_trend(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let weights: Vec<f64> = if period % 2 == 0 {
        let mut w = vec![1.0 / period as f64; period + 1];
        w[0] *= 0.5;
        w[period] *= 0.5;
        w
    } else {
        vec![1.0 / period as f64; period]
    };
    let half = weights.len() / 2;

    let mut trend = vec![f64::NAN; n];
    if n < weights.len() {
        return trend;
    }
    for (t, slot) in trend.iter_mut().enumerate().take(n - half).skip(half) {
        let start = t - half;
        *slot = weights
            .iter()
            .zip(&values[start..start + weights.len()])
            .map(|(w, v)| w * v)
            .sum();
    }
    trend
}

fn mean_centered_phase_profile(values: &[f64], period: usize) -> Vec<f64> {
    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];

    for (t, value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        let phase = t % period;
        sums[phase] += *value;
        counts[phase] += 1;
    }

    let mut profile = vec![0.0; period];
    for phase in 0..period {
        if counts[phase] > 0 {
            profile[phase] = sums[phase] / counts[phase] as f64;
        }
    }

    let mean = profile.iter().sum::<f64>() / period as f64;
    for value in &mut profile {
        *value -= mean;
    }

    profile
}

/// Back-fills leading gaps from the first defined value, then forward-fills
/// trailing gaps from the last one.
fn fill_edges_from_nearest(values: &mut [f64]) -> Result<(), XyzError> {
    let first = values
        .iter()
        .position(|v| !v.is_nan())
        .ok_or_else(|| XyzError::numerical_issue("decomposition left no defined values"))?;
    let first_value = values[first];
    for value in &mut values[..first] {
        *value = first_value;
    }

    let mut last = first_value;
    for value in values.iter_mut().skip(first) {
        if value.is_nan() {
            *value = last;
        } else {
            last = *value;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        ClassicalAdditive, MovingAverageAdjustment, SeasonalDecomposer, centered_trend,
        deseasonalize_two_tier,
    };
    use xyz_core::XyzError;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "actual={actual}, expected={expected}, tol={tol}"
        );
    }

    struct AlwaysFails;

    impl SeasonalDecomposer for AlwaysFails {
        fn name(&self) -> &'static str {
            "always_fails"
        }

        fn supports(&self, _n: usize, _period: usize) -> bool {
            true
        }

        fn deseasonalize(&self, _values: &[f64], _period: usize) -> Result<Vec<f64>, XyzError> {
            Err(XyzError::numerical_issue("synthetic failure"))
        }
    }

    #[test]
    fn centered_trend_uses_half_weights_for_even_period() {
        let values: Vec<f64> = (0..8).map(|t| t as f64).collect();
        let trend = centered_trend(&values, 4);
        assert!(trend[0].is_nan());
        assert!(trend[1].is_nan());
        assert!(trend[6].is_nan());
        assert!(trend[7].is_nan());
        for t in 2..6 {
            assert_close(trend[t], t as f64, 1e-12);
        }
    }

    #[test]
    fn classical_removes_pure_seasonal_pattern() {
        let pattern = [10.0, 14.0, 6.0, 10.0];
        let values: Vec<f64> = (0..24).map(|t| 50.0 + pattern[t % 4]).collect();
        let out = ClassicalAdditive
            .deseasonalize(&values, 4)
            .expect("classical decomposition should succeed");
        assert_eq!(out.len(), values.len());
        for value in &out {
            assert_close(*value, 60.0, 1e-9);
        }
    }

    #[test]
    fn classical_edges_are_filled_from_nearest_interior_value() {
        let values: Vec<f64> = (0..12).map(|t| t as f64 + [1.0, -1.0, 2.0][t % 3]).collect();
        let out = ClassicalAdditive
            .deseasonalize(&values, 3)
            .expect("classical decomposition should succeed");
        assert!(out.iter().all(|v| v.is_finite()));
        assert_eq!(out[0], out[1]);
        assert_eq!(out[11], out[10]);
    }

    #[test]
    fn classical_capability_requires_two_full_periods() {
        assert!(ClassicalAdditive.supports(24, 12));
        assert!(!ClassicalAdditive.supports(23, 12));
        assert!(ClassicalAdditive.supports(2, 1));
        assert!(!ClassicalAdditive.supports(100, 0));
        assert!(ClassicalAdditive.deseasonalize(&[1.0; 10], 6).is_err());
    }

    #[test]
    fn classical_period_one_is_identity() {
        let values = [50.0, 80.0, 45.0, 90.0, 40.0, 95.0, 35.0, 100.0];
        let outcome =
            deseasonalize_two_tier(&values, 1, &ClassicalAdditive, &MovingAverageAdjustment)
                .expect("period one should deseasonalize");
        assert_eq!(outcome.method, "classical_additive");
        assert!(outcome.fallback_reason.is_none());
        for (actual, expected) in outcome.values.iter().zip(values) {
            assert_close(*actual, expected, 1e-12);
        }
    }

    #[test]
    fn moving_average_subtracts_local_minus_global_mean() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let out = MovingAverageAdjustment
            .deseasonalize(&values, 2)
            .expect("moving average should succeed");
        // window half-width 1: local means 1.5, 2, 3, 4, 5, 5.5; global 3.5
        let expected = [3.0, 3.5, 3.5, 3.5, 3.5, 4.0];
        for (actual, expected) in out.iter().zip(expected) {
            assert_close(*actual, expected, 1e-12);
        }
    }

    #[test]
    fn moving_average_leaves_sub_period_series_unchanged() {
        let values = [3.0, 9.0, 4.0];
        let out = MovingAverageAdjustment
            .deseasonalize(&values, 12)
            .expect("short series should pass through");
        assert_eq!(out, values.to_vec());
    }

    #[test]
    fn two_tier_prefers_classical_when_capable() {
        let values: Vec<f64> = (0..24).map(|t| [1.0, 3.0][t % 2] + 10.0).collect();
        let outcome =
            deseasonalize_two_tier(&values, 2, &ClassicalAdditive, &MovingAverageAdjustment)
                .expect("two tier should succeed");
        assert_eq!(outcome.method, "classical_additive");
        assert!(outcome.fallback_reason.is_none());
    }

    #[test]
    fn two_tier_falls_back_on_insufficient_length() {
        let values: Vec<f64> = (0..18).map(|t| t as f64 + 1.0).collect();
        let outcome =
            deseasonalize_two_tier(&values, 12, &ClassicalAdditive, &MovingAverageAdjustment)
                .expect("two tier should succeed");
        assert_eq!(outcome.method, "moving_average");
        let reason = outcome.fallback_reason.expect("fallback reason should be set");
        assert!(reason.contains("unsupported for n=18, period=12"), "{reason}");
    }

    #[test]
    fn two_tier_falls_back_on_decomposition_failure() {
        let values: Vec<f64> = (0..24).map(|t| t as f64 + 1.0).collect();
        let outcome = deseasonalize_two_tier(&values, 4, &AlwaysFails, &MovingAverageAdjustment)
            .expect("fallback should succeed");
        assert_eq!(outcome.method, "moving_average");
        let reason = outcome.fallback_reason.expect("fallback reason should be set");
        assert!(reason.contains("always_fails failed"), "{reason}");
    }

    #[test]
    fn two_tier_passes_through_when_no_tier_applies() {
        let values = [5.0, 6.0, 7.0];
        let outcome =
            deseasonalize_two_tier(&values, 12, &ClassicalAdditive, &MovingAverageAdjustment)
                .expect("pass-through should succeed");
        assert_eq!(outcome.method, "none");
        assert_eq!(outcome.values, values.to_vec());
    }
}
