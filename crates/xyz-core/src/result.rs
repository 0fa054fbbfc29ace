// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::config::AggregationMethod;
use crate::segment::Segment;
use std::collections::BTreeMap;

/// Which preprocessing steps the configuration requested.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PreprocessingFlags {
    pub trend_removed: bool,
    pub seasonality_removed: bool,
    pub outliers_removed: bool,
}

/// Raw K-means membership recorded when clustering relabels an item.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterAssignment {
    #[cfg_attr(feature = "serde", serde(rename = "kmeans_cluster"))]
    pub cluster: usize,
    #[cfg_attr(feature = "serde", serde(rename = "kmeans_centroid"))]
    pub centroid: f64,
}

/// Classification of one raw demand series.
///
/// `mean` comes from the original series while `std` comes from the
/// preprocessed one.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationResult {
    pub segment: Segment,
    pub variation_value: f64,
    #[cfg_attr(feature = "serde", serde(rename = "mean_demand"))]
    pub mean: f64,
    #[cfg_attr(feature = "serde", serde(rename = "std_demand"))]
    pub std: f64,
    #[cfg_attr(feature = "serde", serde(rename = "coefficient_of_variation"))]
    pub cv: f64,
    pub data_points: usize,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub preprocessing: PreprocessingFlags,
    #[cfg_attr(
        feature = "serde",
        serde(flatten, skip_serializing_if = "Option::is_none")
    )]
    pub kmeans: Option<ClusterAssignment>,
}

/// Classification of one period-error mapping (aggregate strategy).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateResult {
    pub segment: Segment,
    pub aggregated_error: f64,
    pub aggregation_method: AggregationMethod,
    /// Number of periods supplied, null periods included.
    pub period_count: usize,
    pub min_error: f64,
    pub max_error: f64,
    pub mean_error: f64,
    pub std_error: f64,
}

/// Error record for an item whose score could not be computed.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemFailure {
    pub segment: Segment,
    pub error: String,
    pub data_points: usize,
}

impl ItemFailure {
    /// Failed items are always reported in segment Z.
    pub fn new(error: impl Into<String>, data_points: usize) -> Self {
        Self {
            segment: Segment::Z,
            error: error.into(),
            data_points,
        }
    }
}

/// Per-item result-or-error record.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Clone, Debug, PartialEq)]
pub enum ItemOutcome<R> {
    Classified(R),
    Failed(ItemFailure),
}

/// Item id -> outcome, ordered by item id.
pub type ItemResults<R> = BTreeMap<String, ItemOutcome<R>>;

/// Common view over the two result kinds used by reporting.
pub trait ScoredResult {
    fn segment(&self) -> Segment;

    /// The scalar the segment was derived from.
    fn score(&self) -> f64;
}

impl ScoredResult for ClassificationResult {
    fn segment(&self) -> Segment {
        self.segment
    }

    fn score(&self) -> f64 {
        self.variation_value
    }
}

impl ScoredResult for AggregateResult {
    fn segment(&self) -> Segment {
        self.segment
    }

    fn score(&self) -> f64 {
        self.aggregated_error
    }
}

impl<R: ScoredResult> ItemOutcome<R> {
    pub fn segment(&self) -> Segment {
        match self {
            Self::Classified(result) => result.segment(),
            Self::Failed(failure) => failure.segment,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn classified(&self) -> Option<&R> {
        match self {
            Self::Classified(result) => Some(result),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Classified(_) => None,
            Self::Failed(failure) => Some(failure.error.as_str()),
        }
    }
}
