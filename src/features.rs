//! Feature extraction for identifiers
//!
//! Derives a fixed-width numeric vector from a username for the outlier
//! model. The field order below is the wire form: anything consuming
//! `to_array()` assumes exactly this order and width.

use crate::entropy::shannon_entropy;
use serde::{Deserialize, Serialize};

/// Bump whenever a field is added, removed or reordered.
/// Persisted models built against another version are invalid.
pub const FEATURE_SET_VERSION: u32 = 1;

/// Number of dimensions in a [`FeatureVector`]
pub const FEATURE_COUNT: usize = 8;

/// Field names in wire order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "length",
    "shannon_entropy",
    "digit_ratio",
    "separator_count",
    "repeated_char_ratio",
    "is_lowercase",
    "is_uppercase",
    "starts_with_digit",
];

const SEPARATORS: [char; 3] = ['_', '-', '.'];

/// Feature vector for a single identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub length: usize,
    pub shannon_entropy: f64,
    /// Digits / length, in [0, 1]
    pub digit_ratio: f64,
    pub separator_count: usize,
    /// Adjacent equal pairs / length, in [0, 1]
    pub repeated_char_ratio: f64,
    pub is_lowercase: bool,
    pub is_uppercase: bool,
    pub starts_with_digit: bool,
}

impl FeatureVector {
    /// Numeric form in wire order
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.length as f64,
            self.shannon_entropy,
            self.digit_ratio,
            self.separator_count as f64,
            self.repeated_char_ratio,
            bool_to_f64(self.is_lowercase),
            bool_to_f64(self.is_uppercase),
            bool_to_f64(self.starts_with_digit),
        ]
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.to_array().to_vec()
    }
}

fn bool_to_f64(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Extracts [`FeatureVector`]s from identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Number of features produced
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn extract(&self, username: &str) -> FeatureVector {
        let chars: Vec<char> = username.chars().collect();

        FeatureVector {
            length: chars.len(),
            shannon_entropy: shannon_entropy(username),
            digit_ratio: digit_ratio(&chars),
            separator_count: separator_count(&chars),
            repeated_char_ratio: repeated_char_ratio(&chars),
            is_lowercase: is_cased_as(&chars, char::is_lowercase, char::is_uppercase),
            is_uppercase: is_cased_as(&chars, char::is_uppercase, char::is_lowercase),
            starts_with_digit: chars.first().is_some_and(|c| c.is_ascii_digit()),
        }
    }

    /// Batch extraction in wire form, ready for the anomaly detector
    pub fn extract_matrix<S: AsRef<str>>(&self, usernames: &[S]) -> Vec<Vec<f64>> {
        usernames
            .iter()
            .map(|u| self.extract(u.as_ref()).to_vec())
            .collect()
    }
}

fn digit_ratio(chars: &[char]) -> f64 {
    if chars.is_empty() {
        return 0.0;
    }
    chars.iter().filter(|c| c.is_ascii_digit()).count() as f64 / chars.len() as f64
}

fn separator_count(chars: &[char]) -> usize {
    chars.iter().filter(|c| SEPARATORS.contains(c)).count()
}

fn repeated_char_ratio(chars: &[char]) -> f64 {
    if chars.is_empty() {
        return 0.0;
    }
    let repeats = chars.windows(2).filter(|w| w[0] == w[1]).count();
    repeats as f64 / chars.len() as f64
}

/// True when at least one cased character exists and none is in the other case
fn is_cased_as(chars: &[char], wanted: fn(char) -> bool, other: fn(char) -> bool) -> bool {
    chars.iter().any(|&c| wanted(c)) && !chars.iter().any(|&c| other(c))
}

/// Share of characters that are neither letters nor digits
pub fn special_char_ratio(username: &str) -> f64 {
    let mut total = 0usize;
    let mut special = 0usize;
    for c in username.chars() {
        total += 1;
        if !c.is_alphanumeric() {
            special += 1;
        }
    }
    special as f64 / total.max(1) as f64
}
