// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use xyz_core::{Segment, SegmentationThresholds};

/// Static threshold rule. Both limits are inclusive upper bounds; a NaN score
/// falls through to `Z`.
pub fn classify_score(score: f64, thresholds: &SegmentationThresholds) -> Segment {
    if score <= thresholds.x_upper_limit {
        Segment::X
    } else if score <= thresholds.y_upper_limit {
        Segment::Y
    } else {
        Segment::Z
    }
}
