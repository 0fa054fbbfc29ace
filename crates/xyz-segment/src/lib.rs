// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod aggregate;
pub mod classifier;
pub mod engine;
pub mod kmeans;
pub mod variation;

pub use aggregate::{aggregate, aggregate_period_errors};
pub use classifier::classify_score;
pub use engine::{
    ChunkedResults, DEFAULT_CHUNK_SIZE, PeriodErrorItems, SegmentationInput, SegmentationOutput,
    SeriesItems, XyzSegmenter,
};
pub use kmeans::{KMeansConfig, KMeansFit, fit_kmeans_1d, segment_map};
pub use variation::{VariationMetrics, coefficient_of_variation, variation_metrics};

/// Segmentation engine namespace.
pub fn crate_name() -> &'static str {
    let _ = (xyz_core::crate_name(), xyz_preprocess::crate_name());
    "xyz-segment"
}
