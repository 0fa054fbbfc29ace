// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod request;
pub mod result;
pub mod segment;
pub mod series;
pub mod stats;

pub use config::{
    AggregationMethod, CalculationStrategy, SegmentationConfig, SegmentationThresholds,
};
pub use error::XyzError;
pub use request::{ConfigRequest, ThresholdsRequest};
pub use result::{
    AggregateResult, ClassificationResult, ClusterAssignment, ItemFailure, ItemOutcome,
    ItemResults, PreprocessingFlags, ScoredResult,
};
pub use segment::Segment;
pub use series::{PeriodErrorSeries, SeriesCheck, check_series};

/// Core shared types for xyz-rs.
pub fn crate_name() -> &'static str {
    "xyz-core"
}
