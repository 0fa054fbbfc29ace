// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! One-dimensional K-means over a batch of scores.
//!
//! Seeding is k-means++ driven by a splitmix64 generator so a fixed seed
//! reproduces the same fit on every platform.

use xyz_core::{Segment, XyzError, stats};

const DEFAULT_N_INIT: usize = 10;
const DEFAULT_MAX_ITER: usize = 300;
const DEFAULT_TOL: f64 = 1e-4;
const DEFAULT_SEED: u64 = 42;

#[derive(Clone, Debug, PartialEq)]
pub struct KMeansConfig {
    pub n_clusters: usize,
    /// Independent seeded restarts; the lowest-inertia fit wins.
    pub n_init: usize,
    pub max_iter: usize,
    /// Relative convergence tolerance, scaled by the data variance.
    pub tol: f64,
    pub seed: u64,
}

impl KMeansConfig {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            n_init: DEFAULT_N_INIT,
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOL,
            seed: DEFAULT_SEED,
        }
    }

    fn validate(&self) -> Result<(), XyzError> {
        if self.n_clusters == 0 {
            return Err(XyzError::invalid_input(
                "KMeansConfig.n_clusters must be >= 1; got 0",
            ));
        }
        if self.n_init == 0 {
            return Err(XyzError::invalid_input(
                "KMeansConfig.n_init must be >= 1; got 0",
            ));
        }
        if self.max_iter == 0 {
            return Err(XyzError::invalid_input(
                "KMeansConfig.max_iter must be >= 1; got 0",
            ));
        }
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(XyzError::invalid_input(format!(
                "KMeansConfig.tol must be finite and >= 0; got {}",
                self.tol
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct KMeansFit {
    pub centroids: Vec<f64>,
    /// Cluster id per input value, in input order.
    pub labels: Vec<usize>,
    pub inertia: f64,
    pub iterations: usize,
}

pub fn fit_kmeans_1d(values: &[f64], config: &KMeansConfig) -> Result<KMeansFit, XyzError> {
    config.validate()?;
    if values.len() < config.n_clusters {
        return Err(XyzError::invalid_input(format!(
            "K-means needs at least {} values; got {}",
            config.n_clusters,
            values.len()
        )));
    }
    if let Some(bad) = values.iter().find(|value| !value.is_finite()) {
        return Err(XyzError::numerical_issue(format!(
            "K-means input contains non-finite value {bad}"
        )));
    }

    let variance = stats::population_std(values).map_or(0.0, |std| std * std);
    let tol = config.tol * variance;
    let mut rng = StableRng::new(config.seed);

    let mut best: Option<KMeansFit> = None;
    for _ in 0..config.n_init {
        let init = kmeans_plus_plus(values, config.n_clusters, &mut rng);
        let fit = lloyd(values, init, config.max_iter, tol);
        if best.as_ref().is_none_or(|current| fit.inertia < current.inertia) {
            best = Some(fit);
        }
    }

    best.ok_or_else(|| XyzError::numerical_issue("K-means produced no fit"))
}

/// Maps each cluster id to a segment by centroid rank: 3 clusters give
/// X/Y/Z, 2 give X/Z, any other count splits the ranks into thirds.
pub fn segment_map(centroids: &[f64]) -> Vec<Segment> {
    let k = centroids.len();
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| centroids[a].total_cmp(&centroids[b]).then(a.cmp(&b)));

    let mut map = vec![Segment::Z; k];
    for (rank, &cluster) in order.iter().enumerate() {
        map[cluster] = match k {
            3 => [Segment::X, Segment::Y, Segment::Z][rank],
            2 => [Segment::X, Segment::Z][rank],
            _ if rank * 3 < k => Segment::X,
            _ if rank * 3 < 2 * k => Segment::Y,
            _ => Segment::Z,
        };
    }
    map
}

fn kmeans_plus_plus(values: &[f64], k: usize, rng: &mut StableRng) -> Vec<f64> {
    let n = values.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(values[rng.gen_index(n)]);

    let mut closest: Vec<f64> = values
        .iter()
        .map(|value| (value - centroids[0]).powi(2))
        .collect();

    while centroids.len() < k {
        let total: f64 = closest.iter().sum();
        let pick = if total > 0.0 {
            let target = rng.next_f64() * total;
            let mut cumulative = 0.0;
            closest
                .iter()
                .position(|d2| {
                    cumulative += d2;
                    cumulative > target
                })
                .unwrap_or(n - 1)
        } else {
            rng.gen_index(n)
        };

        let centroid = values[pick];
        centroids.push(centroid);
        for (d2, value) in closest.iter_mut().zip(values) {
            *d2 = d2.min((value - centroid).powi(2));
        }
    }
    centroids
}

fn lloyd(values: &[f64], mut centroids: Vec<f64>, max_iter: usize, tol: f64) -> KMeansFit {
    let k = centroids.len();
    let mut labels = vec![0usize; values.len()];
    let mut iterations = 0usize;

    while iterations < max_iter {
        iterations += 1;
        assign(values, &centroids, &mut labels);

        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for (value, &label) in values.iter().zip(&labels) {
            sums[label] += value;
            counts[label] += 1;
        }

        let mut shift = 0.0;
        for cluster in 0..k {
            // Empty clusters keep their previous centroid.
            if counts[cluster] == 0 {
                continue;
            }
            let updated = sums[cluster] / counts[cluster] as f64;
            shift += (updated - centroids[cluster]).powi(2);
            centroids[cluster] = updated;
        }

        if shift <= tol {
            break;
        }
    }

    let inertia = assign(values, &centroids, &mut labels);
    KMeansFit {
        centroids,
        labels,
        inertia,
        iterations,
    }
}

/// Nearest-centroid assignment (ties go to the lower id); returns inertia.
fn assign(values: &[f64], centroids: &[f64], labels: &mut [usize]) -> f64 {
    let mut inertia = 0.0;
    for (value, label) in values.iter().zip(labels.iter_mut()) {
        let mut best = 0usize;
        let mut best_d2 = f64::INFINITY;
        for (cluster, centroid) in centroids.iter().enumerate() {
            let d2 = (value - centroid).powi(2);
            if d2 < best_d2 {
                best = cluster;
                best_d2 = d2;
            }
        }
        *label = best;
        inertia += best_d2;
    }
    inertia
}

#[derive(Clone, Debug)]
struct StableRng {
    state: u64,
}

impl StableRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9e3779b97f4a7c15),
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)` from the top 53 bits.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// `upper` must be non-zero.
    fn gen_index(&mut self, upper: usize) -> usize {
        (self.next_u64() % upper as u64) as usize
    }
}
