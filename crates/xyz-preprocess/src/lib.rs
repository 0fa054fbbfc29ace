// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod seasonal;

pub use seasonal::{
    ClassicalAdditive, MovingAverageAdjustment, SeasonalDecomposer, SeasonalOutcome,
    deseasonalize_two_tier,
};

use tracing::debug;
use xyz_core::{SegmentationConfig, XyzError, stats};

const DEFAULT_OUTLIER_WINDOW: usize = 2;
const DEFAULT_DETREND_MIN_POINTS: usize = 3;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct OutlierRepairConfig {
    /// Absolute z-score above which a point counts as an outlier.
    pub std_threshold: f64,
    /// Neighbor radius used to rebuild an outlier.
    pub window: usize,
}

impl Default for OutlierRepairConfig {
    fn default() -> Self {
        Self {
            std_threshold: xyz_core::config::DEFAULT_OUTLIER_STD_THRESHOLD,
            window: DEFAULT_OUTLIER_WINDOW,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct DetrendConfig {
    /// Shorter series are passed through untouched.
    pub min_points: usize,
}

impl Default for DetrendConfig {
    fn default() -> Self {
        Self {
            min_points: DEFAULT_DETREND_MIN_POINTS,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct DeseasonalizeConfig {
    pub period: usize,
}

/// Step toggles. Steps always run in the order outlier repair, detrend,
/// deseasonalize.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreprocessConfig {
    pub outlier_repair: Option<OutlierRepairConfig>,
    pub detrend: Option<DetrendConfig>,
    pub deseasonalize: Option<DeseasonalizeConfig>,
}

impl PreprocessConfig {
    pub fn from_segmentation(config: &SegmentationConfig) -> Self {
        Self {
            outlier_repair: config.outlier_removal.then(|| OutlierRepairConfig {
                std_threshold: config.outlier_std_threshold,
                ..OutlierRepairConfig::default()
            }),
            detrend: config.remove_trend.then(DetrendConfig::default),
            deseasonalize: config.remove_seasonality.then(|| DeseasonalizeConfig {
                period: config.seasonality_period,
            }),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.outlier_repair.is_none() && self.detrend.is_none() && self.deseasonalize.is_none()
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepReport {
    pub step: String,
    pub notes: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PreprocessedSeries {
    values: Vec<f64>,
    reports: Vec<StepReport>,
}

impl PreprocessedSeries {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn reports(&self) -> &[StepReport] {
        &self.reports
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PreprocessPipeline {
    config: PreprocessConfig,
}

impl PreprocessPipeline {
    pub fn new(config: PreprocessConfig) -> Result<Self, XyzError> {
        validate_config(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Applies the configured steps to a copy of `values`.
    ///
    /// Every value must be finite; the output always has the input length.
    pub fn apply(&self, values: &[f64]) -> Result<PreprocessedSeries, XyzError> {
        if let Some((idx, value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(XyzError::numerical_issue(format!(
                "series contains non-finite value {value} at index {idx}"
            )));
        }

        let mut out = values.to_vec();
        let mut reports = vec![];

        if let Some(cfg) = &self.config.outlier_repair {
            let repaired = apply_outlier_repair(&mut out, cfg);
            reports.push(StepReport {
                step: "outlier_repair".to_string(),
                notes: vec![format!(
                    "std_threshold={}, window={}, repaired={repaired}",
                    cfg.std_threshold, cfg.window
                )],
            });
        }

        if let Some(cfg) = &self.config.detrend {
            let note = apply_detrend(&mut out, cfg)?;
            reports.push(StepReport {
                step: "detrend".to_string(),
                notes: vec![note],
            });
        }

        if let Some(cfg) = &self.config.deseasonalize {
            let outcome =
                deseasonalize_two_tier(&out, cfg.period, &ClassicalAdditive, &MovingAverageAdjustment)?;
            let mut notes = vec![format!("method={}, period={}", outcome.method, cfg.period)];
            if let Some(reason) = outcome.fallback_reason {
                debug!(method = outcome.method, %reason, "seasonal decomposition fell back");
                notes.push(format!("fallback: {reason}"));
            }
            out = outcome.values;
            reports.push(StepReport {
                step: "deseasonalize".to_string(),
                notes,
            });
        }

        Ok(PreprocessedSeries {
            values: out,
            reports,
        })
    }
}

fn validate_config(config: &PreprocessConfig) -> Result<(), XyzError> {
    if let Some(outliers) = &config.outlier_repair {
        if !outliers.std_threshold.is_finite() || outliers.std_threshold <= 0.0 {
            return Err(XyzError::invalid_input(format!(
                "Outlier repair std_threshold must be finite and > 0, got {}",
                outliers.std_threshold
            )));
        }
        if outliers.window == 0 {
            return Err(XyzError::invalid_input(
                "Outlier repair window must be >= 1",
            ));
        }
    }

    if let Some(detrend) = &config.detrend {
        if detrend.min_points < 2 {
            return Err(XyzError::invalid_input(format!(
                "Detrend min_points must be >= 2, got {}",
                detrend.min_points
            )));
        }
    }

    if let Some(deseason) = &config.deseasonalize {
        if deseason.period == 0 {
            return Err(XyzError::invalid_input(
                "Deseasonalize period must be >= 1",
            ));
        }
    }

    Ok(())
}

/// Replaces every point whose |z-score| exceeds the threshold by the mean of
/// the non-outlier points within `window` positions. Returns how many points
/// were rewritten.
fn apply_outlier_repair(values: &mut [f64], cfg: &OutlierRepairConfig) -> usize {
    let (Some(mean), Some(std)) = (stats::mean(values), stats::population_std(values)) else {
        return 0;
    };
    if std == 0.0 {
        return 0;
    }

    let outlier: Vec<bool> = values
        .iter()
        .map(|value| ((value - mean) / std).abs() > cfg.std_threshold)
        .collect();

    let n = values.len();
    let mut repaired = 0usize;
    for idx in (0..n).filter(|&idx| outlier[idx]) {
        let start = idx.saturating_sub(cfg.window);
        let end = idx.saturating_add(cfg.window).saturating_add(1).min(n);
        let (sum, count) = (start..end)
            .filter(|&j| j != idx && !outlier[j])
            .fold((0.0, 0usize), |(sum, count), j| (sum + values[j], count + 1));
        if count > 0 {
            values[idx] = sum / count as f64;
            repaired += 1;
        }
    }
    repaired
}

fn apply_detrend(values: &mut [f64], cfg: &DetrendConfig) -> Result<String, XyzError> {
    if values.len() < cfg.min_points {
        return Ok(format!(
            "skipped: n={} below min_points={}",
            values.len(),
            cfg.min_points
        ));
    }

    let samples: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(t, y)| (t as f64, *y))
        .collect();
    let (intercept, slope) = fit_linear(&samples)
        .ok_or_else(|| XyzError::numerical_issue("detrend linear fit is ill-conditioned"))?;
    for (t, value) in values.iter_mut().enumerate() {
        *value -= intercept + slope * t as f64;
    }
    Ok(format!("method=linear, slope={slope}, intercept={intercept}"))
}

fn fit_linear(samples: &[(f64, f64)]) -> Option<(f64, f64)> {
    let m = samples.len() as f64;
    let (sum_t, sum_y, sum_tt, sum_ty) = samples
        .iter()
        .fold((0.0, 0.0, 0.0, 0.0), |(st, sy, stt, sty), (t, y)| {
            (st + *t, sy + *y, stt + t * t, sty + t * y)
        });
    let denom = m * sum_tt - sum_t * sum_t;
    if !denom.is_finite() || denom.abs() <= f64::EPSILON {
        return None;
    }
    let slope = (m * sum_ty - sum_t * sum_y) / denom;
    let intercept = (sum_y - slope * sum_t) / m;
    Some((intercept, slope))
}

/// Optional preprocessing namespace.
pub fn crate_name() -> &'static str {
    let _ = xyz_core::crate_name();
    "xyz-preprocess"
}
