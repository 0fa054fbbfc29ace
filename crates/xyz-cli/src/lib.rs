// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use xyz_core::{ConfigRequest, PeriodErrorSeries, Segment, SegmentationConfig, XyzError};
use xyz_segment::{PeriodErrorItems, SeriesItems};

/// Parses `{"item": [number | null, ...]}`; `null` is read as NaN.
pub fn parse_series_document(raw: &str) -> Result<SeriesItems, XyzError> {
    let parsed: BTreeMap<String, Vec<Option<f64>>> = serde_json::from_str(raw)
        .map_err(|err| XyzError::invalid_input(format!("invalid series JSON: {err}")))?;
    Ok(parsed
        .into_iter()
        .map(|(id, values)| {
            let values = values
                .into_iter()
                .map(|value| value.unwrap_or(f64::NAN))
                .collect();
            (id, values)
        })
        .collect())
}

/// Parses `{"item": {"period": number | null, ...}}`.
pub fn parse_period_errors_document(raw: &str) -> Result<PeriodErrorItems, XyzError> {
    serde_json::from_str::<BTreeMap<String, PeriodErrorSeries>>(raw)
        .map_err(|err| XyzError::invalid_input(format!("invalid period-error JSON: {err}")))
}

/// Parses `{"item": "X" | "Y" | "Z"}`.
pub fn parse_segments_document(raw: &str) -> Result<BTreeMap<String, Segment>, XyzError> {
    serde_json::from_str(raw)
        .map_err(|err| XyzError::invalid_input(format!("invalid segments JSON: {err}")))
}

/// Parses a loose configuration object; absent fields take their defaults.
pub fn parse_config_request(raw: &str) -> Result<ConfigRequest, XyzError> {
    serde_json::from_str(raw)
        .map_err(|err| XyzError::invalid_input(format!("invalid config JSON: {err}")))
}

/// Parses and resolves a configuration document in one step.
pub fn parse_config_document(raw: &str) -> Result<SegmentationConfig, XyzError> {
    parse_config_request(raw)?.into_config()
}

/// CLI namespace.
pub fn crate_name() -> &'static str {
    let _ = (
        xyz_core::crate_name(),
        xyz_segment::crate_name(),
        xyz_report::crate_name(),
    );
    "xyz-cli"
}
