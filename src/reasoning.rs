//! Templated, human-readable explanations

use crate::anomaly::AnomalyStatus;
use crate::entropy::{round_to, shannon_entropy};
use crate::features::special_char_ratio;
use crate::text::sequence_ratio;
use serde::Serialize;

/// The few identifier facts an anomaly explanation quotes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExplanationFeatures {
    pub entropy: f64,
    pub length: usize,
    pub special_char_ratio: f64,
}

impl ExplanationFeatures {
    /// Entropy and special-character ratio rounded to 2 decimal places
    pub fn from_identifier(identifier: &str) -> Self {
        Self {
            entropy: round_to(shannon_entropy(identifier), 2),
            length: identifier.chars().count(),
            special_char_ratio: round_to(special_char_ratio(identifier), 2),
        }
    }
}

/// Lightweight two-identifier comparison, independent of vector scoring
#[derive(Debug, Clone, Serialize)]
pub struct LightweightComparison {
    pub username_1: String,
    pub username_2: String,
    pub similarity_score: f64,
    pub entropy_user1: f64,
    pub entropy_user2: f64,
    pub reasoning: String,
}

pub fn explain_anomaly(
    identifier: &str,
    features: &ExplanationFeatures,
    status: AnomalyStatus,
) -> String {
    let facts = format!(
        "Entropy={}, Length={}, SpecialChars={}.",
        features.entropy, features.length, features.special_char_ratio
    );
    match status {
        AnomalyStatus::Anomaly => format!(
            "Username '{identifier}' flagged as anomaly. {facts} \
             Pattern deviates significantly from training distribution."
        ),
        AnomalyStatus::Normal => format!(
            "Username '{identifier}' considered normal. {facts} \
             Fits within expected distribution."
        ),
    }
}

pub fn compare_usernames(username_1: &str, username_2: &str) -> LightweightComparison {
    let similarity = round_to(sequence_ratio(username_1, username_2) * 100.0, 2);
    let entropy_1 = shannon_entropy(username_1);
    let entropy_2 = shannon_entropy(username_2);

    let similarity_note = if similarity > 80.0 {
        "Usernames are highly similar, possibly same person."
    } else if similarity > 50.0 {
        "Moderate similarity, could be variant or alias."
    } else {
        "Low similarity, likely different users."
    };
    let entropy_note = if (entropy_1 - entropy_2).abs() < 0.5 {
        "Entropy levels are close, suggesting similar style."
    } else {
        "Entropy difference is large, styles may differ."
    };

    LightweightComparison {
        username_1: username_1.to_string(),
        username_2: username_2.to_string(),
        similarity_score: similarity,
        entropy_user1: entropy_1,
        entropy_user2: entropy_2,
        reasoning: format!("{similarity_note} {entropy_note}"),
    }
}
