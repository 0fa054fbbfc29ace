// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use tracing::debug;
use xyz_core::{ItemOutcome, ItemResults, ScoredResult, Segment, stats};

const HIGH_VOLATILITY_SHARE: f64 = 40.0;
const AUTOMATION_SHARE: f64 = 60.0;

/// One value per segment, serialized as `{"X": .., "Y": .., "Z": ..}`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PerSegment<T> {
    #[cfg_attr(feature = "serde", serde(rename = "X"))]
    pub x: T,
    #[cfg_attr(feature = "serde", serde(rename = "Y"))]
    pub y: T,
    #[cfg_attr(feature = "serde", serde(rename = "Z"))]
    pub z: T,
}

impl<T> PerSegment<T> {
    pub fn get(&self, segment: Segment) -> &T {
        match segment {
            Segment::X => &self.x,
            Segment::Y => &self.y,
            Segment::Z => &self.z,
        }
    }

    pub fn get_mut(&mut self, segment: Segment) -> &mut T {
        match segment {
            Segment::X => &mut self.x,
            Segment::Y => &mut self.y,
            Segment::Z => &mut self.z,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentationSummary {
    pub total_items: usize,
    /// Counts of successfully classified items; failures are only in
    /// `error_count`.
    pub segment_distribution: PerSegment<usize>,
    pub error_count: usize,
    /// Percentage of items without an error, `0` for an empty batch.
    pub success_rate: f64,
}

pub fn generate_summary<R: ScoredResult>(results: &ItemResults<R>) -> SegmentationSummary {
    let mut segment_distribution = PerSegment::<usize>::default();
    let mut error_count = 0usize;
    for outcome in results.values() {
        match outcome {
            ItemOutcome::Classified(result) => *segment_distribution.get_mut(result.segment()) += 1,
            ItemOutcome::Failed(_) => error_count += 1,
        }
    }

    let total_items = results.len();
    let success_rate = if total_items == 0 {
        0.0
    } else {
        (total_items - error_count) as f64 / total_items as f64 * 100.0
    };
    debug!(total_items, error_count, success_rate, "summary generated");

    SegmentationSummary {
        total_items,
        segment_distribution,
        error_count,
        success_rate,
    }
}

/// Score statistics for the items of one segment.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentMetrics {
    pub count: usize,
    pub mean_variation: f64,
    pub min_variation: f64,
    pub max_variation: f64,
    pub std_variation: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentDetail {
    pub items: Vec<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub metrics: Option<SegmentMetrics>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemError {
    pub item_id: String,
    pub error: String,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetailedAnalysis {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub segments: PerSegment<SegmentDetail>,
    pub errors: Vec<ItemError>,
}

/// Groups item ids by segment and computes per-segment score statistics.
/// Failed items are listed under `errors` only.
pub fn generate_detailed_analysis<R: ScoredResult>(results: &ItemResults<R>) -> DetailedAnalysis {
    let mut analysis = DetailedAnalysis::default();
    let mut scores = PerSegment::<Vec<f64>>::default();

    for (item_id, outcome) in results {
        match outcome {
            ItemOutcome::Classified(result) => {
                let segment = result.segment();
                analysis.segments.get_mut(segment).items.push(item_id.clone());
                scores.get_mut(segment).push(result.score());
            }
            ItemOutcome::Failed(failure) => analysis.errors.push(ItemError {
                item_id: item_id.clone(),
                error: failure.error.clone(),
            }),
        }
    }

    for segment in Segment::ALL {
        analysis.segments.get_mut(segment).metrics = segment_metrics(scores.get(segment));
    }
    analysis
}

fn segment_metrics(scores: &[f64]) -> Option<SegmentMetrics> {
    Some(SegmentMetrics {
        count: scores.len(),
        mean_variation: stats::mean(scores)?,
        min_variation: stats::min(scores)?,
        max_variation: stats::max(scores)?,
        std_variation: stats::population_std(scores)?,
    })
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SegmentShare {
    pub count: usize,
    /// Share of all items, rounded to two decimals.
    pub percentage: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecommendationKind {
    HighVolatility,
    AutomationOpportunity,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Recommendation {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: RecommendationKind,
    pub severity: Severity,
    pub message: String,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct DistributionAnalysis {
    pub total_items: usize,
    pub segment_distribution: PerSegment<SegmentShare>,
    pub recommendations: Vec<Recommendation>,
}

/// Share of each segment over an existing item -> segment assignment, with
/// planning recommendations when Z or X dominates.
pub fn analyze_distribution(segments: &BTreeMap<String, Segment>) -> DistributionAnalysis {
    let total_items = segments.len();
    let mut segment_distribution = PerSegment::<SegmentShare>::default();
    for segment in segments.values() {
        segment_distribution.get_mut(*segment).count += 1;
    }
    for segment in Segment::ALL {
        let share = segment_distribution.get_mut(segment);
        share.percentage = if total_items == 0 {
            0.0
        } else {
            round2(share.count as f64 / total_items as f64 * 100.0)
        };
    }

    let mut recommendations = vec![];
    let z_share = segment_distribution.z.percentage;
    if z_share > HIGH_VOLATILITY_SHARE {
        recommendations.push(Recommendation {
            kind: RecommendationKind::HighVolatility,
            severity: Severity::Warning,
            message: format!(
                "{z_share:.1}% of items are in Z segment. Consider advanced forecasting methods."
            ),
        });
    }
    let x_share = segment_distribution.x.percentage;
    if x_share > AUTOMATION_SHARE {
        recommendations.push(Recommendation {
            kind: RecommendationKind::AutomationOpportunity,
            severity: Severity::Info,
            message: format!(
                "{x_share:.1}% of items are in X segment. Good candidates for automated forecasting."
            ),
        });
    }

    DistributionAnalysis {
        total_items,
        segment_distribution,
        recommendations,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Reporting namespace.
pub fn crate_name() -> &'static str {
    let _ = xyz_core::crate_name();
    "xyz-report"
}
