//! Alias candidate generation and likelihood scoring
//!
//! Variants come from a fixed set of aliasing tricks (leetspeak, numeric
//! suffixes, separator swaps, wrapping underscores). Each candidate is scored
//! against its source by sequence similarity and entropy closeness.

use crate::entropy::{round_to, shannon_entropy};
use crate::text::sequence_ratio;
use indexmap::IndexSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Leetspeak substitutions, applied case-insensitively
pub const LEET_MAP: &[(char, char)] = &[('a', '4'), ('e', '3'), ('i', '1'), ('o', '0'), ('s', '5')];

/// Numeric suffixes appended to the source
pub const SUFFIXES: &[&str] = &["123", "321", "2023", "2024", "99"];

const SIMILARITY_WEIGHT: f64 = 0.7;
const ENTROPY_WEIGHT: f64 = 0.3;
/// Entropy gap at which the entropy term reaches zero
const ENTROPY_SPAN: f64 = 5.0;

/// A scored alias candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasCandidate {
    pub source: String,
    pub candidate: String,
    /// Sequence ratio x 100, 2 decimal places
    pub similarity: f64,
    /// |H(source) - H(candidate)|, 3 decimal places
    pub entropy_diff: f64,
    /// 0..=100, 2 decimal places
    #[serde(rename = "likelihood_score")]
    pub likelihood: f64,
}

/// Deterministic alias predictor
#[derive(Debug, Clone, Copy, Default)]
pub struct AliasPredictor;

impl AliasPredictor {
    pub fn new() -> Self {
        Self
    }

    /// Candidate variants in generation order, without duplicates or the source itself
    pub fn generate_variants(&self, identifier: &str) -> Vec<String> {
        let mut variants: IndexSet<String> = IndexSet::new();

        variants.insert(leetspeak(identifier));
        for suffix in SUFFIXES {
            variants.insert(format!("{identifier}{suffix}"));
        }
        variants.insert(identifier.replace(' ', "_"));
        variants.insert(identifier.replace(' ', "."));
        variants.insert(format!("_{identifier}_"));

        variants.shift_remove(identifier);
        variants.into_iter().collect()
    }

    /// Score one candidate against its source
    pub fn score(&self, source: &str, candidate: &str) -> AliasCandidate {
        let ratio = sequence_ratio(source, candidate);
        let entropy_diff = (shannon_entropy(source) - shannon_entropy(candidate)).abs();
        let likelihood = ((ratio * SIMILARITY_WEIGHT
            + (1.0 - entropy_diff / ENTROPY_SPAN) * ENTROPY_WEIGHT)
            * 100.0)
            .clamp(0.0, 100.0);

        AliasCandidate {
            source: source.to_string(),
            candidate: candidate.to_string(),
            similarity: round_to(ratio * 100.0, 2),
            entropy_diff: round_to(entropy_diff, 3),
            likelihood: round_to(likelihood, 2),
        }
    }

    /// Generate and score every variant, preserving generation order
    pub fn predict_future_aliases(&self, identifier: &str) -> Vec<AliasCandidate> {
        let variants = self.generate_variants(identifier);
        let scored: Vec<AliasCandidate> = variants
            .par_iter()
            .map(|candidate| self.score(identifier, candidate))
            .collect();
        tracing::debug!(identifier, count = scored.len(), "scored alias candidates");
        scored
    }
}

fn leetspeak(identifier: &str) -> String {
    identifier
        .chars()
        .map(|c| {
            let lower = c.to_ascii_lowercase();
            LEET_MAP
                .iter()
                .find(|(from, _)| *from == lower)
                .map_or(c, |&(_, to)| to)
        })
        .collect()
}
