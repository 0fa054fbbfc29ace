// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use xyz_core::SegmentationConfig;
use xyz_segment::{KMeansConfig, SeriesItems, XyzSegmenter, fit_kmeans_1d};

const ITEMS: usize = 10_000;
const PERIODS: usize = 36;

fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

fn unit(state: &mut u64) -> f64 {
    (lcg_next(state) >> 11) as f64 / (1u64 << 53) as f64
}

/// Monthly demand with a per-item level, noise amplitude and yearly cycle.
fn synthetic_items(count: usize, periods: usize) -> SeriesItems {
    let mut state = 0x5eed_0000_c0ff_ee00_u64;
    (0..count)
        .map(|item| {
            let level = 20.0 + 480.0 * unit(&mut state);
            let noise = 0.02 + 0.6 * unit(&mut state);
            let season = 0.3 * unit(&mut state);
            let values = (0..periods)
                .map(|t| {
                    let phase = (t % 12) as f64 / 12.0 * std::f64::consts::TAU;
                    let jitter = (unit(&mut state) - 0.5) * 2.0 * noise;
                    (level * (1.0 + season * phase.sin() + jitter)).max(0.0)
                })
                .collect();
            (format!("SKU-{item:05}"), values)
        })
        .collect()
}

fn benchmark_segmentation(c: &mut Criterion) {
    let items = synthetic_items(ITEMS, PERIODS);
    let mut group = c.benchmark_group("segment_batch");
    group.sample_size(10);

    let configs = [
        ("thresholds", SegmentationConfig::default()),
        (
            "full_preprocess",
            SegmentationConfig {
                remove_trend: true,
                remove_seasonality: true,
                outlier_removal: true,
                ..SegmentationConfig::default()
            },
        ),
        (
            "kmeans",
            SegmentationConfig {
                use_kmeans: true,
                ..SegmentationConfig::default()
            },
        ),
    ];

    for (name, config) in configs {
        let segmenter = XyzSegmenter::new(config).expect("benchmark config should validate");
        group.bench_with_input(BenchmarkId::new(name, ITEMS), &items, |b, items| {
            b.iter(|| black_box(segmenter.segment_items(black_box(items))))
        });
    }

    let segmenter =
        XyzSegmenter::new(SegmentationConfig::default()).expect("default config should validate");
    group.bench_function("chunked_1000", |b| {
        b.iter(|| {
            segmenter
                .segment_items_chunked(black_box(&items), 1000)
                .expect("chunked run should succeed")
        })
    });
    group.finish();

    let mut state = 0xabcd_u64;
    let scores: Vec<f64> = (0..ITEMS).map(|_| 100.0 * unit(&mut state)).collect();
    c.bench_function("kmeans_1d_k3_n1e4", |b| {
        b.iter(|| {
            fit_kmeans_1d(black_box(&scores), &KMeansConfig::new(3))
                .expect("kmeans should fit")
        })
    });
}

criterion_group!(benches, benchmark_segmentation);
criterion_main!(benches);
