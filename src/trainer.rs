//! Model training and persistence
//!
//! Two artifacts live under the model directory:
//! - `username_similarity.json`: an n-gram vector space fitted on a corpus,
//!   plus the corpus vectors
//! - `username_classifier.json`: a vector space plus a multinomial logistic
//!   regression over caller-supplied labels
//!
//! Artifacts are written atomically (temp file, flush, rename) and are never
//! modified in place. Retraining writes a new file over the old one.

use crate::entropy::round_to;
use crate::error::{ReconError, ReconResult};
use crate::features::FEATURE_SET_VERSION;
use crate::text::{cosine, NgramVectorizer, SparseVector};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Bump when the on-disk layout of either artifact changes
pub const FORMAT_VERSION: u32 = 1;

pub const SIMILARITY_ARTIFACT: &str = "username_similarity.json";
pub const CLASSIFIER_ARTIFACT: &str = "username_classifier.json";

/// Logistic regression training configuration
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Maximum full-batch gradient steps
    pub max_iter: usize,
    /// Inverse L2 regularization strength
    pub c: f64,
    pub learning_rate: f64,
    /// Stop early once the largest gradient component falls below this
    pub tolerance: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_iter: 500,
            c: 1.0,
            learning_rate: 1.0,
            tolerance: 1e-6,
        }
    }
}

/// Returned by both train operations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainOutcome {
    pub status: String,
    pub model: PathBuf,
}

impl TrainOutcome {
    fn trained(model: &Path) -> Self {
        Self {
            status: "trained".to_string(),
            model: model.to_path_buf(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelPrediction {
    pub username: String,
    pub label: String,
    /// Highest class probability x 100, 2 decimal places
    pub confidence: f64,
}

// ── Artifacts ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct SimilarityArtifact {
    format_version: u32,
    feature_set_version: u32,
    vectorizer: NgramVectorizer,
    reference_vectors: Vec<SparseVector>,
    trained_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClassifierArtifact {
    format_version: u32,
    vectorizer: NgramVectorizer,
    classifier: LogisticRegression,
    labels: Vec<String>,
    trained_at: DateTime<Utc>,
}

/// Vector space fitted once on a training corpus and loaded from disk.
///
/// Unlike the per-call space used by the similarity scorer, every
/// comparison shares one vocabulary, so scores are comparable across calls.
#[derive(Debug, Clone)]
pub struct PersistedVectorSpace {
    vectorizer: NgramVectorizer,
    corpus_size: usize,
}

impl PersistedVectorSpace {
    pub fn load(path: &Path) -> ReconResult<Self> {
        let artifact: SimilarityArtifact = read_artifact("compare_usernames", path)?;
        check_version("compare_usernames", path, artifact.format_version, FORMAT_VERSION)?;
        check_version(
            "compare_usernames",
            path,
            artifact.feature_set_version,
            FEATURE_SET_VERSION,
        )?;
        Ok(Self {
            vectorizer: artifact.vectorizer,
            corpus_size: artifact.reference_vectors.len(),
        })
    }

    /// Cosine similarity in [0, 1]
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        cosine(&self.vectorizer.transform(a), &self.vectorizer.transform(b))
    }

    pub fn corpus_size(&self) -> usize {
        self.corpus_size
    }
}

// ── Logistic regression ──────────────────────────────────────────────────

/// Multinomial logistic regression over sparse rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// [class][feature]
    weights: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

impl LogisticRegression {
    /// Full-batch gradient descent on mean cross-entropy plus `|W|^2 / (2 C n)`.
    /// Intercepts are not regularized.
    pub fn fit(
        rows: &[SparseVector],
        targets: &[usize],
        n_classes: usize,
        n_features: usize,
        config: &ClassifierConfig,
    ) -> Self {
        let mut model = Self {
            weights: vec![vec![0.0; n_features]; n_classes],
            intercepts: vec![0.0; n_classes],
        };
        let n = rows.len().max(1) as f64;
        let penalty = 1.0 / (config.c * n);

        for iteration in 0..config.max_iter {
            let mut grad_w = vec![vec![0.0; n_features]; n_classes];
            let mut grad_b = vec![0.0; n_classes];

            for (row, &target) in rows.iter().zip(targets) {
                let probs = model.predict_proba(row);
                for (class, p) in probs.iter().enumerate() {
                    let err = p - if class == target { 1.0 } else { 0.0 };
                    grad_b[class] += err;
                    for &(col, x) in row {
                        grad_w[class][col] += err * x;
                    }
                }
            }

            let mut largest: f64 = 0.0;
            for class in 0..n_classes {
                for (w, g) in model.weights[class].iter_mut().zip(&grad_w[class]) {
                    let step = g / n + *w * penalty;
                    largest = largest.max(step.abs());
                    *w -= config.learning_rate * step;
                }
                let step = grad_b[class] / n;
                largest = largest.max(step.abs());
                model.intercepts[class] -= config.learning_rate * step;
            }

            if largest < config.tolerance {
                tracing::debug!(iteration, "logistic regression converged");
                break;
            }
        }

        model
    }

    /// Softmax class probabilities for one row
    pub fn predict_proba(&self, row: &SparseVector) -> Vec<f64> {
        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.intercepts)
            .map(|(w, b)| b + row.iter().map(|&(col, x)| w[col] * x).sum::<f64>())
            .collect();
        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f64 = exp.iter().sum();
        exp.into_iter().map(|e| e / total).collect()
    }

    pub fn n_classes(&self) -> usize {
        self.intercepts.len()
    }
}

// ── Trainer ──────────────────────────────────────────────────────────────

/// Fits, persists and queries the similarity and classifier artifacts
#[derive(Debug, Clone)]
pub struct ModelTrainer {
    model_dir: PathBuf,
    similarity_path: PathBuf,
    classifier_path: PathBuf,
    config: ClassifierConfig,
}

impl ModelTrainer {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        let model_dir = model_dir.into();
        Self {
            similarity_path: model_dir.join(SIMILARITY_ARTIFACT),
            classifier_path: model_dir.join(CLASSIFIER_ARTIFACT),
            model_dir,
            config: ClassifierConfig::default(),
        }
    }

    pub fn with_classifier_config(mut self, config: ClassifierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn similarity_path(&self) -> &Path {
        &self.similarity_path
    }

    pub fn classifier_path(&self) -> &Path {
        &self.classifier_path
    }

    /// Fit a vector space on `corpus` and persist it with the corpus vectors
    pub fn train_similarity<S: AsRef<str>>(&mut self, corpus: &[S]) -> ReconResult<TrainOutcome> {
        if corpus.is_empty() {
            return Err(ReconError::invalid("train_similarity", "", "corpus is empty"));
        }

        let vectorizer = NgramVectorizer::fit(corpus);
        let reference_vectors = corpus
            .iter()
            .map(|doc| vectorizer.transform(doc.as_ref()))
            .collect();
        tracing::info!(
            documents = corpus.len(),
            vocabulary = vectorizer.vocabulary_size(),
            "trained similarity vector space"
        );

        let artifact = SimilarityArtifact {
            format_version: FORMAT_VERSION,
            feature_set_version: FEATURE_SET_VERSION,
            vectorizer,
            reference_vectors,
            trained_at: Utc::now(),
        };
        write_artifact("train_similarity", &self.similarity_path, &artifact)?;
        Ok(TrainOutcome::trained(&self.similarity_path))
    }

    /// Cosine similarity x 100 (2 decimal places) in the persisted space
    pub fn compare_usernames(&self, username_1: &str, username_2: &str) -> ReconResult<f64> {
        let space = PersistedVectorSpace::load(&self.similarity_path)?;
        Ok(round_to(space.similarity(username_1, username_2) * 100.0, 2))
    }

    pub fn train_classifier<S: AsRef<str>, L: AsRef<str>>(
        &mut self,
        corpus: &[S],
        labels: &[L],
    ) -> ReconResult<TrainOutcome> {
        if corpus.is_empty() || labels.is_empty() {
            return Err(ReconError::invalid(
                "train_classifier",
                "",
                "corpus and labels must be non-empty",
            ));
        }
        if corpus.len() != labels.len() {
            return Err(ReconError::invalid(
                "train_classifier",
                "",
                format!("{} usernames but {} labels", corpus.len(), labels.len()),
            ));
        }

        // Sorted, so class order is stable across runs
        let classes: Vec<String> = labels
            .iter()
            .map(|l| l.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let targets: Vec<usize> = labels
            .iter()
            .map(|l| {
                classes
                    .binary_search_by(|c| c.as_str().cmp(l.as_ref()))
                    .unwrap_or_default()
            })
            .collect();

        let vectorizer = NgramVectorizer::fit(corpus);
        let rows: Vec<SparseVector> = corpus
            .iter()
            .map(|doc| vectorizer.transform(doc.as_ref()))
            .collect();
        let classifier = LogisticRegression::fit(
            &rows,
            &targets,
            classes.len(),
            vectorizer.vocabulary_size(),
            &self.config,
        );
        tracing::info!(
            documents = corpus.len(),
            classes = classes.len(),
            "trained username classifier"
        );

        let artifact = ClassifierArtifact {
            format_version: FORMAT_VERSION,
            vectorizer,
            classifier,
            labels: classes,
            trained_at: Utc::now(),
        };
        write_artifact("train_classifier", &self.classifier_path, &artifact)?;
        Ok(TrainOutcome::trained(&self.classifier_path))
    }

    pub fn predict_label(&self, username: &str) -> ReconResult<LabelPrediction> {
        let artifact: ClassifierArtifact = read_artifact("predict_label", &self.classifier_path)?;
        check_version(
            "predict_label",
            &self.classifier_path,
            artifact.format_version,
            FORMAT_VERSION,
        )?;
        if artifact.labels.len() != artifact.classifier.n_classes() {
            return Err(corrupt(
                "predict_label",
                &self.classifier_path,
                "label set does not match classifier",
            ));
        }

        let probs = artifact
            .classifier
            .predict_proba(&artifact.vectorizer.transform(username));
        // First maximum wins ties
        let (best, confidence) = probs
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(bi, bp), (i, &p)| {
                if p > bp {
                    (i, p)
                } else {
                    (bi, bp)
                }
            });

        Ok(LabelPrediction {
            username: username.to_string(),
            label: artifact.labels[best].clone(),
            confidence: round_to(confidence * 100.0, 2),
        })
    }
}

// ── Persistence ──────────────────────────────────────────────────────────

fn read_artifact<T: DeserializeOwned>(op: &'static str, path: &Path) -> ReconResult<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ReconError::NotTrained {
                op,
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(ReconError::persistence(op, path, e)),
    };
    serde_json::from_str(&content).map_err(|e| {
        ReconError::persistence(
            op,
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })
}

/// Write to a uniquely named sibling temp file, flush, fsync, then rename
/// over `path`. The temp file is removed on any failure.
fn write_artifact<T: Serialize>(op: &'static str, path: &Path, artifact: &T) -> ReconResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| ReconError::persistence(op, dir, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());

    let result = (|| -> std::io::Result<()> {
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{file_name}."))
            .suffix(".tmp")
            .tempfile_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, artifact)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        // a failed persist hands the temp file back; dropping it deletes it
        tmp.persist(path).map(|_| ()).map_err(|e| e.error)
    })();

    result.map_err(|e| ReconError::persistence(op, path, e))?;
    tracing::info!("Model saved to {}", path.display());
    Ok(())
}

fn check_version(op: &'static str, path: &Path, found: u32, expected: u32) -> ReconResult<()> {
    if found == expected {
        return Ok(());
    }
    Err(corrupt(
        op,
        path,
        &format!("artifact version {found}, expected {expected}; retrain the model"),
    ))
}

fn corrupt(op: &'static str, path: &Path, message: &str) -> ReconError {
    ReconError::persistence(
        op,
        path,
        std::io::Error::new(std::io::ErrorKind::InvalidData, message.to_string()),
    )
}
