// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

/// Period label -> error value; `None` marks a period without a value.
pub type PeriodErrorSeries = BTreeMap<String, Option<f64>>;

/// Outcome of the minimum-data and degeneracy checks applied before scoring.
///
/// Anything other than [`SeriesCheck::Valid`] means the item is silently left
/// out of the result mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeriesCheck {
    Valid,
    TooShort { len: usize, required: usize },
    AllMissing,
    AllZero,
}

impl SeriesCheck {
    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl fmt::Display for SeriesCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => f.write_str("valid"),
            Self::TooShort { len, required } => {
                write!(f, "too short: {len} points, {required} required")
            }
            Self::AllMissing => f.write_str("all values are missing"),
            Self::AllZero => f.write_str("all values are zero"),
        }
    }
}

/// Applies the validity rules in order: length, all-NaN, all-zero.
///
/// NaN is neither zero nor a valid observation, so a series mixing zeros and
/// NaN passes the all-zero check and is rejected later during scoring.
pub fn check_series(values: &[f64], min_data_points: usize) -> SeriesCheck {
    if values.len() < min_data_points {
        return SeriesCheck::TooShort {
            len: values.len(),
            required: min_data_points,
        };
    }
    if values.iter().all(|value| value.is_nan()) {
        return SeriesCheck::AllMissing;
    }
    if values.iter().all(|value| *value == 0.0) {
        return SeriesCheck::AllZero;
    }
    SeriesCheck::Valid
}
