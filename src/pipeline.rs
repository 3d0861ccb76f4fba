//! Full recon pipeline for one identifier
//!
//! presence probe → entropy → patterns + alias prediction (in parallel)
//! → anomaly detection over the candidates → per-candidate explanations.

use crate::aliases::{AliasCandidate, AliasPredictor};
use crate::anomaly::AnomalyDetector;
use crate::config::ReconConfig;
use crate::entropy::{classify, normalized_entropy, shannon_entropy};
use crate::error::{ReconError, ReconResult};
use crate::features::FeatureExtractor;
use crate::patterns::{PatternAnalyzer, PatternReport};
use crate::presence::{PresenceMap, PresenceProbe};
use crate::reasoning::{explain_anomaly, ExplanationFeatures};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub username: String,
    pub timestamp: DateTime<Utc>,
    pub analysis: Analysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub social_presence: PresenceMap,
    pub entropy: EntropyBlock,
    pub patterns: PatternReport,
    pub predicted_aliases: Vec<AliasCandidate>,
    pub anomaly_reports: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntropyBlock {
    pub raw: f64,
    pub normalized: f64,
    pub class: String,
}

impl EntropyBlock {
    fn of(username: &str) -> Self {
        Self {
            raw: shannon_entropy(username),
            normalized: normalized_entropy(username),
            class: classify(username).to_string(),
        }
    }
}

/// Run every analysis step for `username` and assemble the report
pub fn run_recon(
    username: &str,
    probe: &dyn PresenceProbe,
    config: &ReconConfig,
) -> ReconResult<ReconReport> {
    if username.trim().is_empty() {
        return Err(ReconError::invalid("run_recon", username, "username is empty"));
    }
    let start = Instant::now();

    tracing::info!("Searching platforms for '{}'...", username);
    let social_presence = probe.probe(username);

    let entropy = EntropyBlock::of(username);

    tracing::info!("Generating predictive aliases...");
    let (patterns, predicted_aliases) = rayon::join(
        || PatternAnalyzer::new().analyze(username),
        || AliasPredictor::new().predict_future_aliases(username),
    );

    tracing::info!("Running anomaly detection...");
    let anomaly_reports = explain_candidates(&predicted_aliases, config)?;

    tracing::info!(
        aliases = predicted_aliases.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Recon complete"
    );

    Ok(ReconReport {
        username: username.to_string(),
        timestamp: Utc::now(),
        analysis: Analysis {
            social_presence,
            entropy,
            patterns,
            predicted_aliases,
            anomaly_reports,
        },
    })
}

/// Fit the detector on the candidates' feature vectors and explain each verdict
fn explain_candidates(
    candidates: &[AliasCandidate],
    config: &ReconConfig,
) -> ReconResult<Vec<String>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let names: Vec<&str> = candidates.iter().map(|c| c.candidate.as_str()).collect();
    let matrix = FeatureExtractor::new().extract_matrix(&names);

    let mut detector = AnomalyDetector::with_config(config.anomaly_config())?;
    detector.fit(&matrix)?;
    let statuses = detector.batch_predict(&matrix)?;

    Ok(names
        .iter()
        .zip(statuses)
        .map(|(name, status)| {
            explain_anomaly(name, &ExplanationFeatures::from_identifier(name), status)
        })
        .collect())
}
