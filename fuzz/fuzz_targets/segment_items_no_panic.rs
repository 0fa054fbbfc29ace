// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use libfuzzer_sys::fuzz_target;
use xyz_core::{
    AggregationMethod, CalculationStrategy, PeriodErrorSeries, Segment, SegmentationConfig,
    SegmentationThresholds,
};
use xyz_report::{generate_detailed_analysis, generate_summary};
use xyz_segment::{PeriodErrorItems, SeriesItems, XyzSegmenter};

fn build_value(mode_seed: u8, raw_seed: i16, decoded: f64) -> f64 {
    match mode_seed % 8 {
        0 => decoded,
        1 => f64::from(raw_seed),
        2 => f64::from(raw_seed).abs() / 4.0,
        3 => 0.0,
        4 => f64::NAN,
        5 => f64::INFINITY,
        6 => f64::NEG_INFINITY,
        _ => f64::from(raw_seed % 64),
    }
}

fn build_method(seed: u8) -> AggregationMethod {
    match seed % 5 {
        0 => AggregationMethod::Average,
        1 => AggregationMethod::Median,
        2 => AggregationMethod::Sum,
        3 => AggregationMethod::Min,
        _ => AggregationMethod::Max,
    }
}

fn build_config(cursor: &mut common::ByteCursor<'_>) -> SegmentationConfig {
    let flags = cursor.next_u8();
    let thresholds = if flags & 0x80 == 0 {
        None
    } else {
        Some(SegmentationThresholds {
            x_upper_limit: f64::from(cursor.next_i16()) / 8.0,
            y_upper_limit: f64::from(cursor.next_i16()) / 8.0,
        })
    };
    SegmentationConfig {
        strategy: CalculationStrategy::Variation,
        thresholds,
        use_cv_squared: flags & 0x01 != 0,
        remove_trend: flags & 0x02 != 0,
        remove_seasonality: flags & 0x04 != 0,
        seasonality_period: common::bounded(cursor.next_u8(), 0, 16),
        aggregation_method: build_method(cursor.next_u8()),
        min_data_points: common::bounded(cursor.next_u8(), 0, 12),
        use_kmeans: flags & 0x08 != 0,
        kmeans_clusters: common::bounded(cursor.next_u8(), 0, 6),
        outlier_removal: flags & 0x10 != 0,
        outlier_std_threshold: f64::from(cursor.next_i16()) / 64.0,
    }
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);
    let config = build_config(&mut cursor);

    let payload_len = common::bounded(cursor.next_u8(), 0, 64).saturating_mul(8);
    let mut decoded = common::decode_f64_chunks(&cursor.take_padded(payload_len), 64);
    if decoded.is_empty() {
        decoded.push(1.0);
    }

    let item_count = common::bounded(cursor.next_u8(), 0, 12);
    let mut items = SeriesItems::new();
    let mut errors = PeriodErrorItems::new();
    let mut decoded_idx = 0usize;
    for item in 0..item_count {
        let len = common::bounded(cursor.next_u8(), 0, 40);
        let mut values = Vec::with_capacity(len);
        let mut periods = PeriodErrorSeries::new();
        for t in 0..len {
            let base = decoded[decoded_idx % decoded.len()];
            decoded_idx = decoded_idx.wrapping_add(1);
            let value = build_value(cursor.next_u8(), cursor.next_i16(), base);
            values.push(value);
            let period_value = if cursor.next_u8() % 5 == 0 { None } else { Some(value) };
            periods.insert(format!("p{t:02}"), period_value);
        }
        items.insert(format!("item-{item}"), values);
        errors.insert(format!("item-{item}"), periods);
    }

    let Ok(segmenter) = XyzSegmenter::new(config) else {
        return;
    };

    let results = segmenter.segment_items(&items);
    for (id, outcome) in &results {
        assert!(items.contains_key(id));
        if outcome.is_failed() {
            assert_eq!(outcome.segment(), Segment::Z);
        }
    }
    let summary = generate_summary(&results);
    assert_eq!(summary.total_items, results.len());
    let _ = generate_detailed_analysis(&results);

    let chunk_size = common::bounded(cursor.next_u8(), 0, 8);
    if let Ok(chunked) = segmenter.segment_items_chunked(&items, chunk_size) {
        assert_eq!(chunked.results.len(), results.len());
    }

    let aggregated = segmenter.segment_from_error_metrics(&errors);
    for (id, outcome) in &aggregated {
        assert!(errors.contains_key(id));
        if outcome.is_failed() {
            assert_eq!(outcome.segment(), Segment::Z);
        }
    }
    let _ = generate_summary(&aggregated);
});
