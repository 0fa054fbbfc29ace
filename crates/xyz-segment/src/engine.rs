// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::aggregate::aggregate_period_errors;
use crate::classifier::classify_score;
use crate::kmeans::{KMeansConfig, fit_kmeans_1d, segment_map};
use crate::variation::variation_metrics;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use xyz_core::{
    AggregateResult, CalculationStrategy, ClassificationResult, ClusterAssignment, ItemFailure,
    ItemOutcome, ItemResults, PeriodErrorSeries, PreprocessingFlags, Segment,
    SegmentationConfig, SegmentationThresholds, XyzError, check_series,
};
use xyz_preprocess::{PreprocessConfig, PreprocessPipeline};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Item id -> raw demand series.
pub type SeriesItems = BTreeMap<String, Vec<f64>>;
/// Item id -> period-error mapping.
pub type PeriodErrorItems = BTreeMap<String, PeriodErrorSeries>;

#[derive(Clone, Debug, PartialEq)]
pub enum SegmentationInput {
    Series(SeriesItems),
    PeriodErrors(PeriodErrorItems),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SegmentationOutput {
    Classified(ItemResults<ClassificationResult>),
    Aggregated(ItemResults<AggregateResult>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChunkedResults {
    pub results: ItemResults<ClassificationResult>,
    pub batches_processed: usize,
}

/// Batch XYZ segmentation engine bound to one validated configuration.
///
/// Every entry point is a pure function of its input and the configuration.
/// With K-means enabled the labels of a batch depend on every item in that
/// batch, so chunking can change them.
#[derive(Clone, Debug)]
pub struct XyzSegmenter {
    config: SegmentationConfig,
    thresholds: SegmentationThresholds,
    pipeline: PreprocessPipeline,
}

impl XyzSegmenter {
    pub fn new(config: SegmentationConfig) -> Result<Self, XyzError> {
        config.validate()?;
        let pipeline = PreprocessPipeline::new(PreprocessConfig::from_segmentation(&config))?;
        Ok(Self {
            thresholds: config.effective_thresholds(),
            config,
            pipeline,
        })
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Dispatches on the configured strategy. The input kind must match it.
    pub fn classify(&self, input: &SegmentationInput) -> Result<SegmentationOutput, XyzError> {
        match (self.config.strategy, input) {
            (CalculationStrategy::Variation, SegmentationInput::Series(items)) => {
                Ok(SegmentationOutput::Classified(self.segment_items(items)))
            }
            (CalculationStrategy::Aggregate, SegmentationInput::PeriodErrors(items)) => Ok(
                SegmentationOutput::Aggregated(self.segment_from_error_metrics(items)),
            ),
            (strategy, SegmentationInput::Series(_)) => Err(XyzError::invalid_input(format!(
                "strategy {} expects period-error mappings, got raw series",
                strategy.as_str()
            ))),
            (strategy, SegmentationInput::PeriodErrors(_)) => {
                Err(XyzError::invalid_input(format!(
                    "strategy {} expects raw series, got period-error mappings",
                    strategy.as_str()
                )))
            }
        }
    }

    /// Scores every valid series; items failing the minimum-data checks are
    /// absent from the output.
    pub fn segment_items(&self, items: &SeriesItems) -> ItemResults<ClassificationResult> {
        let batch: Vec<(&String, &Vec<f64>)> = items.iter().collect();
        self.segment_batch(&batch)
    }

    /// Runs [`Self::segment_items`] over consecutive chunks of the ordered
    /// item ids. K-means, when enabled, is fitted per chunk.
    pub fn segment_items_chunked(
        &self,
        items: &SeriesItems,
        chunk_size: usize,
    ) -> Result<ChunkedResults, XyzError> {
        if chunk_size == 0 {
            return Err(XyzError::invalid_input("chunk_size must be >= 1; got 0"));
        }

        let ordered: Vec<(&String, &Vec<f64>)> = items.iter().collect();
        let mut results = ItemResults::new();
        let mut batches_processed = 0usize;
        for chunk in ordered.chunks(chunk_size) {
            results.extend(self.segment_batch(chunk));
            batches_processed += 1;
        }
        debug!(
            items = items.len(),
            chunk_size, batches_processed, "chunked segmentation complete"
        );

        Ok(ChunkedResults {
            results,
            batches_processed,
        })
    }

    /// Aggregate-strategy path: one scalar per item from its period errors,
    /// classified by static thresholds only.
    pub fn segment_from_error_metrics(
        &self,
        items: &PeriodErrorItems,
    ) -> ItemResults<AggregateResult> {
        if self.config.use_kmeans {
            warn!("K-means is not applied to aggregated period errors; using static thresholds");
        }

        let mut results = ItemResults::new();
        for (id, periods) in items {
            match aggregate_period_errors(periods, self.config.aggregation_method, &self.thresholds)
            {
                Ok(Some(result)) => {
                    results.insert(id.clone(), ItemOutcome::Classified(result));
                }
                Ok(None) => debug!(item = %id, "skipping item without period errors"),
                Err(err) => {
                    debug!(item = %id, error = %err, "aggregation failed");
                    results.insert(
                        id.clone(),
                        ItemOutcome::Failed(ItemFailure::new(err.to_string(), periods.len())),
                    );
                }
            }
        }
        results
    }

    fn segment_batch(&self, batch: &[(&String, &Vec<f64>)]) -> ItemResults<ClassificationResult> {
        debug!(items = batch.len(), "segmenting batch");

        #[cfg(feature = "rayon")]
        let scored: Vec<(String, ItemOutcome<ClassificationResult>)> = batch
            .par_iter()
            .filter_map(|(id, values)| self.score_item(id, values).map(|o| ((*id).clone(), o)))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let scored: Vec<(String, ItemOutcome<ClassificationResult>)> = batch
            .iter()
            .filter_map(|(id, values)| self.score_item(id, values).map(|o| ((*id).clone(), o)))
            .collect();

        let mut results: ItemResults<ClassificationResult> = scored.into_iter().collect();
        if self.config.use_kmeans {
            self.apply_kmeans(&mut results);
        }
        results
    }

    fn score_item(&self, id: &str, values: &[f64]) -> Option<ItemOutcome<ClassificationResult>> {
        let check = check_series(values, self.config.min_data_points);
        if !check.is_valid() {
            debug!(item = %id, reason = %check, "skipping item");
            return None;
        }

        Some(match self.classify_series(id, values) {
            Ok(result) => ItemOutcome::Classified(result),
            Err(err) => {
                debug!(item = %id, error = %err, "item scoring failed");
                ItemOutcome::Failed(ItemFailure::new(err.to_string(), values.len()))
            }
        })
    }

    fn classify_series(&self, id: &str, values: &[f64]) -> Result<ClassificationResult, XyzError> {
        let processed = self.pipeline.apply(values)?;
        for report in processed.reports() {
            debug!(item = %id, step = %report.step, notes = ?report.notes, "preprocessed");
        }

        let metrics = variation_metrics(values, processed.values(), self.config.use_cv_squared)?;
        Ok(ClassificationResult {
            segment: classify_score(metrics.variation_value, &self.thresholds),
            variation_value: metrics.variation_value,
            mean: metrics.mean,
            std: metrics.std,
            cv: metrics.cv,
            data_points: values.len(),
            preprocessing: PreprocessingFlags {
                trend_removed: self.config.remove_trend,
                seasonality_removed: self.config.remove_seasonality,
                outliers_removed: self.config.outlier_removal,
            },
            kmeans: None,
        })
    }

    /// Batch barrier: relabels every classified item from one K-means fit
    /// over the batch. Leaves threshold segments in place when the fit is not
    /// possible.
    fn apply_kmeans(&self, results: &mut ItemResults<ClassificationResult>) {
        let k = self.config.kmeans_clusters;
        let scores: Vec<f64> = results
            .values()
            .filter_map(|outcome| outcome.classified().map(|r| r.variation_value))
            .collect();
        if scores.len() < k {
            warn!(
                valid_items = scores.len(),
                clusters = k,
                "too few valid items for K-means; keeping threshold segments"
            );
            return;
        }

        let fit = match fit_kmeans_1d(&scores, &KMeansConfig::new(k)) {
            Ok(fit) => fit,
            Err(err) => {
                warn!(error = %err, "K-means failed; keeping threshold segments");
                return;
            }
        };
        let segments = segment_map(&fit.centroids);

        let classified = results.values_mut().filter_map(|outcome| match outcome {
            ItemOutcome::Classified(result) => Some(result),
            ItemOutcome::Failed(_) => None,
        });
        for (result, &cluster) in classified.zip(&fit.labels) {
            result.segment = segments.get(cluster).copied().unwrap_or(Segment::Z);
            result.kmeans = Some(ClusterAssignment {
                cluster,
                centroid: fit.centroids[cluster],
            });
        }
        debug!(clusters = k, iterations = fit.iterations, inertia = fit.inertia, "K-means applied");
    }
}

#[cfg(test)]
mod tests {
    use super::{SegmentationInput, SegmentationOutput, SeriesItems, XyzSegmenter};
    use xyz_core::{
        CalculationStrategy, ItemOutcome, PeriodErrorSeries, Segment, SegmentationConfig,
    };

    fn engine(config: SegmentationConfig) -> XyzSegmenter {
        XyzSegmenter::new(config).expect("engine should build")
    }

    fn items(entries: &[(&str, Vec<f64>)]) -> SeriesItems {
        entries
            .iter()
            .map(|(id, values)| (id.to_string(), values.clone()))
            .collect()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = XyzSegmenter::new(SegmentationConfig {
            use_kmeans: true,
            kmeans_clusters: 0,
            ..SegmentationConfig::default()
        })
        .expect_err("zero clusters should fail");
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn nan_inside_valid_series_becomes_failure_record() {
        let input = items(&[
            ("bad", vec![1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0]),
            ("good", vec![10.0; 6]),
        ]);
        let results = engine(SegmentationConfig::default()).segment_items(&input);
        let bad = &results["bad"];
        assert!(bad.is_failed());
        assert_eq!(bad.segment(), Segment::Z);
        assert!(bad.error().is_some_and(|e| e.contains("non-finite")));
        assert_eq!(results["good"].segment(), Segment::X);
    }

    #[test]
    fn degenerate_series_are_omitted() {
        let input = items(&[
            ("zeros", vec![0.0; 8]),
            ("missing", vec![f64::NAN; 8]),
            ("short", vec![1.0, 2.0]),
        ]);
        assert!(engine(SegmentationConfig::default()).segment_items(&input).is_empty());
    }

    #[test]
    fn preprocessing_flags_mirror_config() {
        let config = SegmentationConfig {
            remove_trend: true,
            outlier_removal: true,
            ..SegmentationConfig::default()
        };
        let input = items(&[("a", (0..12).map(|t| 50.0 + t as f64).collect())]);
        let results = engine(config).segment_items(&input);
        let result = results["a"].classified().expect("item should classify");
        assert!(result.preprocessing.trend_removed);
        assert!(result.preprocessing.outliers_removed);
        assert!(!result.preprocessing.seasonality_removed);
        assert!(result.std < 1e-9, "pure trend should leave no variation");
    }

    #[test]
    fn chunk_size_zero_is_rejected() {
        let err = engine(SegmentationConfig::default())
            .segment_items_chunked(&SeriesItems::new(), 0)
            .expect_err("zero chunk size should fail");
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn chunked_reports_batch_count() {
        let input: SeriesItems = (0..5)
            .map(|i| (format!("item-{i}"), vec![10.0 + i as f64; 6]))
            .collect();
        let chunked = engine(SegmentationConfig::default())
            .segment_items_chunked(&input, 2)
            .expect("chunked run should succeed");
        assert_eq!(chunked.batches_processed, 3);
        assert_eq!(chunked.results.len(), 5);

        let empty = engine(SegmentationConfig::default())
            .segment_items_chunked(&SeriesItems::new(), 2)
            .expect("empty run should succeed");
        assert_eq!(empty.batches_processed, 0);
    }

    #[test]
    fn kmeans_degrades_to_thresholds_with_too_few_items() {
        let config = SegmentationConfig {
            use_kmeans: true,
            kmeans_clusters: 3,
            ..SegmentationConfig::default()
        };
        let input = items(&[
            ("a", vec![10.0, 11.0, 10.0, 11.0, 10.0, 11.0]),
            ("b", vec![1.0, 30.0, 1.0, 30.0, 1.0, 30.0]),
        ]);
        let results = engine(config).segment_items(&input);
        for outcome in results.values() {
            assert!(outcome.classified().expect("classified").kmeans.is_none());
        }
        assert_eq!(results["a"].segment(), Segment::X);
        assert_eq!(results["b"].segment(), Segment::Z);
    }

    #[test]
    fn kmeans_records_cluster_and_centroid() {
        let config = SegmentationConfig {
            use_kmeans: true,
            kmeans_clusters: 2,
            ..SegmentationConfig::default()
        };
        let input = items(&[
            ("a", vec![99.0, 101.0, 99.0, 101.0, 99.0, 101.0]),
            ("b", vec![98.0, 102.0, 98.0, 102.0, 98.0, 102.0]),
            ("c", vec![10.0, 190.0, 10.0, 190.0, 10.0, 190.0]),
        ]);
        let results = engine(config).segment_items(&input);
        let a = results["a"].classified().expect("a classified");
        let c = results["c"].classified().expect("c classified");
        assert_eq!(a.segment, Segment::X);
        assert_eq!(c.segment, Segment::Z);
        let a_cluster = a.kmeans.expect("a clustered");
        let c_cluster = c.kmeans.expect("c clustered");
        assert_ne!(a_cluster.cluster, c_cluster.cluster);
        assert!((a_cluster.centroid - 1.5).abs() < 1e-9);
        assert!((c_cluster.centroid - 90.0).abs() < 1e-9);
        assert!((c.variation_value - 90.0).abs() < 1e-9);
    }

    #[test]
    fn classify_dispatches_on_strategy() {
        let series = SegmentationInput::Series(items(&[("a", vec![5.0; 6])]));
        let periods = SegmentationInput::PeriodErrors(
            [(
                "a".to_string(),
                PeriodErrorSeries::from([("p1".to_string(), Some(3.0))]),
            )]
            .into(),
        );

        let variation = engine(SegmentationConfig::default());
        assert!(matches!(
            variation.classify(&series),
            Ok(SegmentationOutput::Classified(_))
        ));
        variation
            .classify(&periods)
            .expect_err("period errors under variation strategy should fail");

        let aggregate = engine(SegmentationConfig {
            strategy: CalculationStrategy::Aggregate,
            use_kmeans: true,
            ..SegmentationConfig::default()
        });
        match aggregate.classify(&periods).expect("aggregate should succeed") {
            SegmentationOutput::Aggregated(results) => {
                assert!(matches!(results["a"], ItemOutcome::Classified(_)));
                assert_eq!(results["a"].segment(), Segment::X);
            }
            other => panic!("unexpected output: {other:?}"),
        }
        aggregate
            .classify(&series)
            .expect_err("raw series under aggregate strategy should fail");
    }
}
