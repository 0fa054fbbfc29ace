// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::XyzError;
use crate::config::{
    AggregationMethod, CalculationStrategy, DEFAULT_X_UPPER_LIMIT, DEFAULT_Y_UPPER_LIMIT,
    SegmentationConfig, SegmentationThresholds,
};

/// Threshold block of a [`ConfigRequest`]; a missing limit takes its default.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ThresholdsRequest {
    pub x_upper_limit: Option<f64>,
    pub y_upper_limit: Option<f64>,
}

/// Loosely-typed configuration as received from callers.
///
/// Every field is optional. Enumerated fields arrive as strings so that the
/// aggregation method can be resolved leniently while the strategy stays a
/// closed set.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigRequest {
    pub strategy: Option<String>,
    pub thresholds: Option<ThresholdsRequest>,
    pub use_cv_squared: Option<bool>,
    pub remove_trend: Option<bool>,
    pub remove_seasonality: Option<bool>,
    pub seasonality_period: Option<usize>,
    pub aggregation_method: Option<String>,
    pub min_data_points: Option<usize>,
    pub use_kmeans: Option<bool>,
    pub kmeans_clusters: Option<usize>,
    pub outlier_removal: Option<bool>,
    pub outlier_std_threshold: Option<f64>,
}

impl ConfigRequest {
    /// Resolves defaults and validates the result.
    pub fn into_config(self) -> Result<SegmentationConfig, XyzError> {
        let defaults = SegmentationConfig::default();

        let strategy = match self.strategy.as_deref() {
            Some(raw) => CalculationStrategy::parse(raw)?,
            None => defaults.strategy,
        };

        let thresholds = self.thresholds.map(|t| SegmentationThresholds {
            x_upper_limit: t.x_upper_limit.unwrap_or(DEFAULT_X_UPPER_LIMIT),
            y_upper_limit: t.y_upper_limit.unwrap_or(DEFAULT_Y_UPPER_LIMIT),
        });

        let aggregation_method = self
            .aggregation_method
            .as_deref()
            .map(AggregationMethod::parse_lenient)
            .unwrap_or(defaults.aggregation_method);

        let config = SegmentationConfig {
            strategy,
            thresholds,
            use_cv_squared: self.use_cv_squared.unwrap_or(defaults.use_cv_squared),
            remove_trend: self.remove_trend.unwrap_or(defaults.remove_trend),
            remove_seasonality: self
                .remove_seasonality
                .unwrap_or(defaults.remove_seasonality),
            seasonality_period: self
                .seasonality_period
                .unwrap_or(defaults.seasonality_period),
            aggregation_method,
            min_data_points: self.min_data_points.unwrap_or(defaults.min_data_points),
            use_kmeans: self.use_kmeans.unwrap_or(defaults.use_kmeans),
            kmeans_clusters: self.kmeans_clusters.unwrap_or(defaults.kmeans_clusters),
            outlier_removal: self.outlier_removal.unwrap_or(defaults.outlier_removal),
            outlier_std_threshold: self
                .outlier_std_threshold
                .unwrap_or(defaults.outlier_std_threshold),
        };
        config.validate()?;
        Ok(config)
    }
}
