// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::classifier::classify_score;
use xyz_core::{
    AggregateResult, AggregationMethod, PeriodErrorSeries, SegmentationThresholds, XyzError, stats,
};

/// Reduces `values` with `method`; `None` when `values` is empty.
pub fn aggregate(values: &[f64], method: AggregationMethod) -> Option<f64> {
    match method {
        AggregationMethod::Average => stats::mean(values),
        AggregationMethod::Median => stats::median(values),
        AggregationMethod::Sum => (!values.is_empty()).then(|| values.iter().sum()),
        AggregationMethod::Min => stats::min(values),
        AggregationMethod::Max => stats::max(values),
    }
}

/// Scores one period-error mapping.
///
/// `Ok(None)` means the item has no non-null period and is left out of the
/// results.
pub fn aggregate_period_errors(
    periods: &PeriodErrorSeries,
    method: AggregationMethod,
    thresholds: &SegmentationThresholds,
) -> Result<Option<AggregateResult>, XyzError> {
    let values: Vec<f64> = periods.values().filter_map(|value| *value).collect();
    if values.is_empty() {
        return Ok(None);
    }
    if let Some((period, value)) = periods
        .iter()
        .find_map(|(period, value)| value.filter(|v| !v.is_finite()).map(|v| (period, v)))
    {
        return Err(XyzError::numerical_issue(format!(
            "period {period} has non-finite error value {value}"
        )));
    }

    let aggregated_error = aggregate(&values, method)
        .ok_or_else(|| XyzError::numerical_issue("aggregation produced no value"))?;
    let summary = |f: fn(&[f64]) -> Option<f64>| f(&values).unwrap_or(f64::NAN);

    Ok(Some(AggregateResult {
        segment: classify_score(aggregated_error, thresholds),
        aggregated_error,
        aggregation_method: method,
        period_count: periods.len(),
        min_error: summary(stats::min),
        max_error: summary(stats::max),
        mean_error: summary(stats::mean),
        std_error: summary(stats::population_std),
    }))
}

#[cfg(test)]
mod tests {
    use super::{aggregate, aggregate_period_errors};
    use xyz_core::{AggregationMethod, PeriodErrorSeries, Segment, SegmentationThresholds};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "actual={actual}, expected={expected}, tol={tol}"
        );
    }

    const METHODS: [AggregationMethod; 5] = [
        AggregationMethod::Average,
        AggregationMethod::Median,
        AggregationMethod::Sum,
        AggregationMethod::Min,
        AggregationMethod::Max,
    ];

    fn periods(values: &[Option<f64>]) -> PeriodErrorSeries {
        values
            .iter()
            .enumerate()
            .map(|(idx, value)| (format!("2024-Q{}", idx + 1), *value))
            .collect()
    }

    #[test]
    fn singleton_is_returned_by_every_reducer() {
        for method in METHODS {
            assert_eq!(aggregate(&[5.0], method), Some(5.0), "{method:?}");
        }
    }

    #[test]
    fn empty_input_has_no_aggregate() {
        for method in METHODS {
            assert_eq!(aggregate(&[], method), None, "{method:?}");
        }
    }

    #[test]
    fn reducers_match_definitions() {
        let values = [4.0, 1.0, 7.0, 2.0];
        assert_eq!(aggregate(&values, AggregationMethod::Average), Some(3.5));
        assert_eq!(aggregate(&values, AggregationMethod::Median), Some(3.0));
        assert_eq!(aggregate(&values, AggregationMethod::Sum), Some(14.0));
        assert_eq!(aggregate(&values, AggregationMethod::Min), Some(1.0));
        assert_eq!(aggregate(&values, AggregationMethod::Max), Some(7.0));
    }

    #[test]
    fn period_errors_skip_nulls_but_count_them() {
        let input = periods(&[Some(5.2), None, Some(6.8), Some(6.0)]);
        let result = aggregate_period_errors(
            &input,
            AggregationMethod::Average,
            &SegmentationThresholds::default(),
        )
        .expect("aggregation should succeed")
        .expect("item should have a result");
        assert_close(result.aggregated_error, 6.0, 1e-12);
        assert_eq!(result.segment, Segment::X);
        assert_eq!(result.period_count, 4);
        assert_eq!(result.min_error, 5.2);
        assert_eq!(result.max_error, 6.8);
        assert_close(result.mean_error, 6.0, 1e-12);
        assert_close(result.std_error, (1.28f64 / 3.0).sqrt(), 1e-12);
    }

    #[test]
    fn all_null_periods_are_excluded() {
        let result = aggregate_period_errors(
            &periods(&[None, None]),
            AggregationMethod::Max,
            &SegmentationThresholds::default(),
        )
        .expect("aggregation should not fail");
        assert!(result.is_none());
    }

    #[test]
    fn sum_can_push_item_into_z() {
        let input = periods(&[Some(9.0), Some(9.0), Some(9.0)]);
        let result = aggregate_period_errors(
            &input,
            AggregationMethod::Sum,
            &SegmentationThresholds::default(),
        )
        .expect("aggregation should succeed")
        .expect("item should have a result");
        assert_eq!(result.aggregated_error, 27.0);
        assert_eq!(result.segment, Segment::Z);
    }

    #[test]
    fn non_finite_period_is_an_error() {
        let err = aggregate_period_errors(
            &periods(&[Some(1.0), Some(f64::INFINITY)]),
            AggregationMethod::Average,
            &SegmentationThresholds::default(),
        )
        .expect_err("infinite error should fail");
        assert!(err.to_string().contains("2024-Q2"), "{err}");
    }
}
