//! Entropy utilities for identifier strings
//!
//! Shannon entropy over the character distribution, a normalized variant,
//! and a coarse Low/Medium/High classification. Two bucket scales exist:
//! the reference scale used for reports and the pattern scale used by the
//! heuristic analyzer. They are kept apart on purpose and must not be merged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bucket boundaries for turning raw entropy (bits) into a class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntropyScale {
    /// Entropy below this is Low
    pub medium_floor: f64,
    /// Entropy at or above this is High
    pub high_floor: f64,
}

/// Scale used for the report's `entropy.class` field
pub const REFERENCE_SCALE: EntropyScale = EntropyScale {
    medium_floor: 2.5,
    high_floor: 4.0,
};

/// Scale used by the pattern analyzer's entropy signal
pub const PATTERN_SCALE: EntropyScale = EntropyScale {
    medium_floor: 2.5,
    high_floor: 3.5,
};

impl EntropyScale {
    pub fn classify(&self, entropy: f64) -> EntropyClass {
        if entropy < self.medium_floor {
            EntropyClass::Low
        } else if entropy < self.high_floor {
            EntropyClass::Medium
        } else {
            EntropyClass::High
        }
    }
}

/// Coarse entropy level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntropyClass {
    Low,
    Medium,
    High,
}

impl EntropyClass {
    /// Human-friendly label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low (predictable)",
            Self::Medium => "Medium (balanced)",
            Self::High => "High (random/complex)",
        }
    }
}

impl std::fmt::Display for EntropyClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Shannon entropy of the character distribution, in bits.
/// Returns 0.0 for the empty string.
pub fn shannon_entropy(text: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut length = 0usize;
    for c in text.chars() {
        *counts.entry(c).or_insert(0) += 1;
        length += 1;
    }
    if length == 0 {
        return 0.0;
    }

    let n = length as f64;
    let entropy: f64 = counts
        .values()
        .map(|&count| {
            let p = count as f64 / n;
            -p * p.log2()
        })
        .sum();
    // A single repeated character yields -0.0
    entropy.max(0.0)
}

/// Entropy divided by its maximum for the observed alphabet, in [0, 1].
/// Returns 0.0 when the string has at most one distinct character.
pub fn normalized_entropy(text: &str) -> f64 {
    let distinct = distinct_chars(text);
    if distinct <= 1 {
        return 0.0;
    }
    let max_entropy = (distinct as f64).log2();
    (shannon_entropy(text) / max_entropy).clamp(0.0, 1.0)
}

/// Classify on the reference scale (Low < 2.5 <= Medium < 4.0 <= High)
pub fn classify(text: &str) -> EntropyClass {
    REFERENCE_SCALE.classify(shannon_entropy(text))
}

fn distinct_chars(text: &str) -> usize {
    let mut seen: Vec<char> = text.chars().collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

/// Round to a fixed number of decimal places for reporting
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
