//! Unsupervised outlier detection
//!
//! A standard scaler followed by an isolation forest. The decision threshold
//! is learned from the fitting batch: the `(1 - contamination)` percentile of
//! the training anomaly scores, so roughly `contamination` of the batch lands
//! above it.
//!
//! Tree construction is seeded per tree from one master seed, so fitting is
//! deterministic even though trees are built in parallel.

use crate::error::{ReconError, ReconResult};
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Euler–Mascheroni constant, used by the average path length estimate
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Expected share of outliers in the fitting batch, in (0, 0.5]
    pub contamination: f64,
    pub n_trees: usize,
    /// Upper bound on the per-tree subsample size
    pub max_samples: usize,
    pub seed: u64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            contamination: 0.1,
            n_trees: 100,
            max_samples: 256,
            seed: 42,
        }
    }
}

impl AnomalyConfig {
    pub fn validate(&self) -> ReconResult<()> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(ReconError::invalid(
                "anomaly_config",
                self.contamination.to_string(),
                "contamination must be in (0, 0.5]",
            ));
        }
        if self.n_trees == 0 {
            return Err(ReconError::invalid("anomaly_config", "n_trees", "must be at least 1"));
        }
        if self.max_samples == 0 {
            return Err(ReconError::invalid(
                "anomaly_config",
                "max_samples",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyStatus {
    Normal,
    Anomaly,
}

impl std::fmt::Display for AnomalyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Normal => "Normal",
            Self::Anomaly => "Anomaly",
        })
    }
}

// ── Scaler ───────────────────────────────────────────────────────────────

/// Per-dimension standardization with population variance
#[derive(Debug, Clone)]
struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    fn fit(batch: &[Vec<f64>], dims: usize) -> Self {
        let n = batch.len() as f64;
        let mut mean = vec![0.0; dims];
        for row in batch {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; dims];
        for row in batch {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m) * (x - m);
            }
        }
        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                // constant column
                if std > 0.0 {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Self { mean, scale }
    }

    fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((x, m), s)| (x - m) / s)
            .collect()
    }
}

// ── Isolation forest ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum IsolationNode {
    Internal {
        feature: usize,
        split: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    Leaf {
        size: usize,
    },
}

impl IsolationNode {
    fn build(rows: &[&[f64]], depth: usize, height_limit: usize, rng: &mut ChaCha8Rng) -> Self {
        if depth >= height_limit || rows.len() <= 1 {
            return Self::Leaf { size: rows.len() };
        }

        let dims = rows[0].len();
        let ranges: Vec<(usize, f64, f64)> = (0..dims)
            .filter_map(|d| {
                let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
                    (lo.min(r[d]), hi.max(r[d]))
                });
                (hi > lo).then_some((d, lo, hi))
            })
            .collect();

        // every row identical on every dimension
        if ranges.is_empty() {
            return Self::Leaf { size: rows.len() };
        }

        let (feature, lo, hi) = ranges[rng.random_range(0..ranges.len())];
        let split = rng.random_range(lo..hi);
        let (left, right): (Vec<&[f64]>, Vec<&[f64]>) =
            rows.iter().partition(|r| r[feature] < split);

        Self::Internal {
            feature,
            split,
            left: Box::new(Self::build(&left, depth + 1, height_limit, rng)),
            right: Box::new(Self::build(&right, depth + 1, height_limit, rng)),
        }
    }

    fn path_length(&self, row: &[f64]) -> f64 {
        let mut node = self;
        let mut depth = 0.0;
        loop {
            match node {
                Self::Leaf { size } => return depth + average_path_length(*size),
                Self::Internal {
                    feature,
                    split,
                    left,
                    right,
                } => {
                    node = if row[*feature] < *split { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful search in a binary search tree of `n` nodes
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
struct IsolationForest {
    trees: Vec<IsolationNode>,
    sample_size: usize,
}

impl IsolationForest {
    fn fit(rows: &[Vec<f64>], config: &AnomalyConfig) -> Self {
        let sample_size = config.max_samples.min(rows.len());
        let height_limit = (sample_size as f64).log2().ceil().max(0.0) as usize;

        let mut master = ChaCha8Rng::seed_from_u64(config.seed);
        let seeds: Vec<u64> = (0..config.n_trees).map(|_| master.random()).collect();

        let trees = seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let sample: Vec<&[f64]> = index::sample(&mut rng, rows.len(), sample_size)
                    .into_iter()
                    .map(|i| rows[i].as_slice())
                    .collect();
                IsolationNode::build(&sample, 0, height_limit, &mut rng)
            })
            .collect();

        Self { trees, sample_size }
    }

    /// Score in (0, 1]; higher means easier to isolate
    fn score(&self, row: &[f64]) -> f64 {
        let mean_path =
            self.trees.iter().map(|t| t.path_length(row)).sum::<f64>() / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size);
        if norm <= 0.0 {
            // single-sample trees cannot separate anything
            return 1.0;
        }
        2f64.powf(-mean_path / norm)
    }
}

// ── Detector ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct FittedModel {
    dims: usize,
    scaler: StandardScaler,
    forest: IsolationForest,
    threshold: f64,
}

/// Outlier detector over fixed-width numeric vectors
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
    model: Option<FittedModel>,
}

impl AnomalyDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnomalyConfig) -> ReconResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            model: None,
        })
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// Learned decision threshold, if fitted
    pub fn threshold(&self) -> Option<f64> {
        self.model.as_ref().map(|m| m.threshold)
    }

    /// Fit on a batch of equal-width vectors. Replaces any previous fit.
    pub fn fit(&mut self, batch: &[Vec<f64>]) -> ReconResult<()> {
        let first = batch
            .first()
            .ok_or_else(|| ReconError::invalid("fit", "", "batch is empty"))?;
        let dims = first.len();
        if dims == 0 {
            return Err(ReconError::invalid("fit", "", "vectors have no dimensions"));
        }
        for (i, row) in batch.iter().enumerate() {
            check_row("fit", row, dims, Some(i))?;
        }

        let scaler = StandardScaler::fit(batch, dims);
        let scaled: Vec<Vec<f64>> = batch.iter().map(|r| scaler.transform(r)).collect();
        let forest = IsolationForest::fit(&scaled, &self.config);

        let mut scores: Vec<f64> = scaled.iter().map(|r| forest.score(r)).collect();
        scores.sort_by(f64::total_cmp);
        let threshold = percentile(&scores, 1.0 - self.config.contamination);

        tracing::debug!(
            rows = batch.len(),
            dims,
            trees = forest.trees.len(),
            threshold,
            "fitted anomaly detector"
        );

        self.model = Some(FittedModel {
            dims,
            scaler,
            forest,
            threshold,
        });
        Ok(())
    }

    /// Raw anomaly score of one vector, in (0, 1]
    pub fn score(&self, vector: &[f64]) -> ReconResult<f64> {
        let model = self.fitted("score", Some(vector))?;
        check_row("score", vector, model.dims, None)?;
        Ok(model.forest.score(&model.scaler.transform(vector)))
    }

    pub fn predict(&self, vector: &[f64]) -> ReconResult<AnomalyStatus> {
        let model = self.fitted("predict", Some(vector))?;
        check_row("predict", vector, model.dims, None)?;
        Ok(model.classify(vector))
    }

    pub fn batch_predict(&self, vectors: &[Vec<f64>]) -> ReconResult<Vec<AnomalyStatus>> {
        let model = self.fitted("batch_predict", None)?;
        vectors
            .iter()
            .enumerate()
            .map(|(i, v)| {
                check_row("batch_predict", v, model.dims, Some(i))?;
                Ok(model.classify(v))
            })
            .collect()
    }

    fn fitted(&self, op: &'static str, vector: Option<&[f64]>) -> ReconResult<&FittedModel> {
        self.model.as_ref().ok_or_else(|| ReconError::NotFitted {
            op,
            vector: vector.map(|v| format!("{v:?}")),
        })
    }
}

impl FittedModel {
    fn classify(&self, vector: &[f64]) -> AnomalyStatus {
        let score = self.forest.score(&self.scaler.transform(vector));
        if score > self.threshold {
            AnomalyStatus::Anomaly
        } else {
            AnomalyStatus::Normal
        }
    }
}

fn check_row(op: &'static str, row: &[f64], dims: usize, index: Option<usize>) -> ReconResult<()> {
    if row.len() != dims {
        return Err(ReconError::DimensionMismatch {
            op,
            row: index,
            expected: dims,
            actual: row.len(),
        });
    }
    if row.iter().any(|x| !x.is_finite()) {
        return Err(ReconError::invalid(op, format!("{row:?}"), "vector contains non-finite values"));
    }
    Ok(())
}

/// Linear-interpolated percentile of an ascending slice, `q` in [0, 1]
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}
