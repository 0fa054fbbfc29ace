// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::XyzError;

pub const DEFAULT_X_UPPER_LIMIT: f64 = 10.0;
pub const DEFAULT_Y_UPPER_LIMIT: f64 = 25.0;
pub const DEFAULT_SEASONALITY_PERIOD: usize = 12;
pub const DEFAULT_MIN_DATA_POINTS: usize = 6;
pub const DEFAULT_KMEANS_CLUSTERS: usize = 3;
pub const DEFAULT_OUTLIER_STD_THRESHOLD: f64 = 3.0;

/// Which input shape drives the classification score.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CalculationStrategy {
    /// Score raw demand series by their coefficient of variation.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "calculate_variation"))]
    Variation,
    /// Score pre-computed period errors through an [`AggregationMethod`].
    #[cfg_attr(feature = "serde", serde(rename = "aggregate_over_periods"))]
    Aggregate,
}

impl CalculationStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Variation => "calculate_variation",
            Self::Aggregate => "aggregate_over_periods",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, XyzError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "calculate_variation" => Ok(Self::Variation),
            "aggregate_over_periods" => Ok(Self::Aggregate),
            _ => Err(XyzError::invalid_input(format!(
                "invalid strategy '{raw}'; expected one of: calculate_variation, aggregate_over_periods"
            ))),
        }
    }
}

/// Reducer used by the aggregate strategy.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AggregationMethod {
    #[default]
    Average,
    Median,
    Sum,
    Min,
    Max,
}

impl AggregationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Median => "median",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Case-insensitive strict parse.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "average" => Some(Self::Average),
            "median" => Some(Self::Median),
            "sum" => Some(Self::Sum),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            _ => None,
        }
    }

    /// Parses `raw`, falling back to [`AggregationMethod::Average`] for
    /// unrecognized names.
    pub fn parse_lenient(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(|| {
            tracing::warn!(
                aggregation_method = raw,
                "unrecognized aggregation method; falling back to average"
            );
            Self::Average
        })
    }
}

/// Static classification limits: `score <= x_upper_limit` is X,
/// `score <= y_upper_limit` is Y, anything above is Z.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentationThresholds {
    pub x_upper_limit: f64,
    pub y_upper_limit: f64,
}

impl Default for SegmentationThresholds {
    fn default() -> Self {
        Self {
            x_upper_limit: DEFAULT_X_UPPER_LIMIT,
            y_upper_limit: DEFAULT_Y_UPPER_LIMIT,
        }
    }
}

impl SegmentationThresholds {
    pub fn new(x_upper_limit: f64, y_upper_limit: f64) -> Result<Self, XyzError> {
        let thresholds = Self {
            x_upper_limit,
            y_upper_limit,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), XyzError> {
        if !self.x_upper_limit.is_finite() || !self.y_upper_limit.is_finite() {
            return Err(XyzError::invalid_input(format!(
                "thresholds must be finite, got x_upper_limit={}, y_upper_limit={}",
                self.x_upper_limit, self.y_upper_limit
            )));
        }
        if self.x_upper_limit > self.y_upper_limit {
            return Err(XyzError::invalid_input(format!(
                "thresholds must satisfy x_upper_limit <= y_upper_limit, got x_upper_limit={}, y_upper_limit={}",
                self.x_upper_limit, self.y_upper_limit
            )));
        }
        Ok(())
    }
}

/// Immutable parameter bundle for one segmentation call.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentationConfig {
    pub strategy: CalculationStrategy,
    pub thresholds: Option<SegmentationThresholds>,
    pub use_cv_squared: bool,
    pub remove_trend: bool,
    pub remove_seasonality: bool,
    pub seasonality_period: usize,
    pub aggregation_method: AggregationMethod,
    pub min_data_points: usize,
    pub use_kmeans: bool,
    pub kmeans_clusters: usize,
    pub outlier_removal: bool,
    pub outlier_std_threshold: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            strategy: CalculationStrategy::Variation,
            thresholds: None,
            use_cv_squared: false,
            remove_trend: false,
            remove_seasonality: false,
            seasonality_period: DEFAULT_SEASONALITY_PERIOD,
            aggregation_method: AggregationMethod::Average,
            min_data_points: DEFAULT_MIN_DATA_POINTS,
            use_kmeans: false,
            kmeans_clusters: DEFAULT_KMEANS_CLUSTERS,
            outlier_removal: false,
            outlier_std_threshold: DEFAULT_OUTLIER_STD_THRESHOLD,
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<(), XyzError> {
        if let Some(thresholds) = &self.thresholds {
            thresholds.validate()?;
        }

        if self.use_kmeans && self.kmeans_clusters == 0 {
            return Err(XyzError::invalid_input(
                "kmeans_clusters must be >= 1 when use_kmeans is set; got 0",
            ));
        }

        if self.remove_seasonality && self.seasonality_period == 0 {
            return Err(XyzError::invalid_input(
                "seasonality_period must be >= 1 when remove_seasonality is set; got 0",
            ));
        }

        if self.outlier_removal
            && (!self.outlier_std_threshold.is_finite() || self.outlier_std_threshold <= 0.0)
        {
            return Err(XyzError::invalid_input(format!(
                "outlier_std_threshold must be finite and > 0 when outlier_removal is set, got {}",
                self.outlier_std_threshold
            )));
        }

        Ok(())
    }

    /// Thresholds in force: the configured ones, or 10 / 25 when unset.
    pub fn effective_thresholds(&self) -> SegmentationThresholds {
        self.thresholds.unwrap_or_default()
    }
}
