//! Hybrid username similarity
//!
//! Two identifiers are normalized, then scored with an equal-weight blend of
//! the sequence-alignment ratio and a character n-gram cosine computed in a
//! vector space fitted on just those two strings. Shared platform presence,
//! when supplied, adds up to 30 points.

use crate::entropy::round_to;
use crate::presence::PresenceMap;
use crate::text::{cosine, normalize, sequence_ratio, NgramVectorizer};
use serde::Serialize;

const SEQUENCE_WEIGHT: f64 = 0.5;
const VECTOR_WEIGHT: f64 = 0.5;
const MAX_PLATFORM_BOOST: f64 = 30.0;

const HIGHLY_LIKELY: f64 = 80.0;
const POSSIBLY: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SimilarityVerdict {
    HighlyLikely,
    Possibly,
    Unlikely,
}

impl SimilarityVerdict {
    pub fn from_score(combined: f64) -> Self {
        if combined >= HIGHLY_LIKELY {
            Self::HighlyLikely
        } else if combined >= POSSIBLY {
            Self::Possibly
        } else {
            Self::Unlikely
        }
    }
}

impl std::fmt::Display for SimilarityVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::HighlyLikely => "Highly likely same user",
            Self::Possibly => "Possibly same user",
            Self::Unlikely => "Unlikely same user",
        })
    }
}

/// Outcome of comparing two identifiers
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityResult {
    pub identifier_a: String,
    pub identifier_b: String,
    pub sequence_score: f64,
    pub vector_score: f64,
    /// 0..=100, 2 decimal places
    pub combined_score: f64,
    pub verdict: String,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_platforms: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platforms_checked: Option<usize>,
}

/// Vector space fitted on exactly the two strings being compared.
///
/// The vocabulary is rebuilt on every call, so scores from different calls
/// live in different spaces and are not comparable with each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerCallVectorSpace;

impl PerCallVectorSpace {
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let vectorizer = NgramVectorizer::fit(&[a, b]);
        cosine(&vectorizer.transform(a), &vectorizer.transform(b))
    }
}

/// Platform overlap between two presence maps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformOverlap {
    pub shared: usize,
    pub checked: usize,
}

impl PlatformOverlap {
    /// Only platforms present in both maps are checked; only `found == Some(true)`
    /// on both sides counts as shared.
    pub fn between(a: &PresenceMap, b: &PresenceMap) -> Self {
        let mut shared = 0;
        let mut checked = 0;
        for (platform, record_a) in a {
            if let Some(record_b) = b.get(platform) {
                checked += 1;
                if record_a.found == Some(true) && record_b.found == Some(true) {
                    shared += 1;
                }
            }
        }
        Self { shared, checked }
    }

    pub fn boost(&self) -> f64 {
        if self.checked == 0 {
            return 0.0;
        }
        self.shared as f64 / self.checked as f64 * MAX_PLATFORM_BOOST
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityScorer {
    vector_space: PerCallVectorSpace,
}

impl SimilarityScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compare(
        &self,
        identifier_a: &str,
        identifier_b: &str,
        presence_a: Option<&PresenceMap>,
        presence_b: Option<&PresenceMap>,
    ) -> SimilarityResult {
        let norm_a = normalize(identifier_a);
        let norm_b = normalize(identifier_b);

        // equal raw input counts as identical even with nothing left to normalize
        let same_raw = !identifier_a.is_empty() && identifier_a == identifier_b;
        let comparable = !norm_a.is_empty() && !norm_b.is_empty();
        let identical = same_raw || (comparable && norm_a == norm_b);

        let (sequence_score, vector_score) = if identical {
            (1.0, 1.0)
        } else if comparable {
            (
                sequence_ratio(&norm_a, &norm_b),
                self.vector_space.similarity(&norm_a, &norm_b),
            )
        } else {
            (0.0, 0.0)
        };

        let mut combined = (sequence_score * SEQUENCE_WEIGHT + vector_score * VECTOR_WEIGHT) * 100.0;

        let overlap = match (presence_a, presence_b) {
            (Some(a), Some(b)) => Some(PlatformOverlap::between(a, b)),
            _ => None,
        };
        if let Some(overlap) = overlap {
            combined = (combined + overlap.boost()).min(100.0);
        }

        let mut reasoning = Vec::new();
        if identical {
            reasoning.push("Both usernames are identical after normalization.");
            reasoning.push(vector_fragment(vector_score));
        } else if !comparable {
            reasoning.push("No comparable characters remain after normalization.");
        } else {
            reasoning.push(sequence_fragment(sequence_score));
            reasoning.push(vector_fragment(vector_score));
        }
        let mut reasoning = reasoning.join(" ");
        if let Some(overlap) = overlap.filter(|o| o.checked > 0) {
            reasoning.push_str(&format!(
                " Both appear on {} shared platforms out of {} checked.",
                overlap.shared, overlap.checked
            ));
        }

        let verdict = SimilarityVerdict::from_score(combined);
        tracing::debug!(
            a = identifier_a,
            b = identifier_b,
            combined,
            "compared identifiers"
        );

        SimilarityResult {
            identifier_a: identifier_a.to_string(),
            identifier_b: identifier_b.to_string(),
            sequence_score,
            vector_score,
            combined_score: round_to(combined, 2),
            verdict: verdict.to_string(),
            reasoning,
            shared_platforms: overlap.map(|o| o.shared),
            platforms_checked: overlap.map(|o| o.checked),
        }
    }
}

fn sequence_fragment(score: f64) -> &'static str {
    if score > 0.8 {
        "They share a very strong character sequence overlap."
    } else if score > 0.5 {
        "There is partial similarity in character sequence."
    } else {
        "The usernames have weak structural similarity."
    }
}

fn vector_fragment(score: f64) -> &'static str {
    if score > 0.7 {
        "Statistical analysis shows high contextual similarity."
    } else if score > 0.4 {
        "There is moderate contextual similarity."
    } else {
        "Contextual similarity is low."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::PresenceRecord;

    fn presence(entries: &[(&str, Option<bool>)]) -> PresenceMap {
        entries
            .iter()
            .map(|(name, found)| {
                (
                    name.to_string(),
                    PresenceRecord {
                        found: *found,
                        ..Default::default()
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_identical_after_normalization() {
        let result = SimilarityScorer::new().compare("Elham_JVDI", "elham.jvdi", None, None);
        assert_eq!(result.combined_score, 100.0);
        assert_eq!(result.verdict, "Highly likely same user");
        assert_eq!(
            result.reasoning,
            "Both usernames are identical after normalization. \
             Statistical analysis shows high contextual similarity."
        );
    }

    #[test]
    fn test_self_comparison_without_comparable_characters() {
        let scorer = SimilarityScorer::new();
        for u in ["___", "李明"] {
            let result = scorer.compare(u, u, None, None);
            assert_eq!(result.combined_score, 100.0, "{u}");
            assert_eq!(result.verdict, "Highly likely same user", "{u}");
        }
        let differ = scorer.compare("___", "李明", None, None);
        assert_eq!(differ.combined_score, 0.0);
        assert!(differ.reasoning.contains("No comparable characters"));
    }

    #[test]
    fn test_self_comparison_short_handle() {
        let result = SimilarityScorer::new().compare("a", "a", None, None);
        assert_eq!(result.combined_score, 100.0);
    }

    #[test]
    fn test_close_variant_is_possible_match() {
        let result = SimilarityScorer::new().compare("elhamjvdi", "elham87jvdi", None, None);
        assert!(result.sequence_score > 0.7);
        assert!(result.combined_score >= 60.0);
        assert_eq!(result.verdict, "Possibly same user");
        assert!(result.shared_platforms.is_none());
    }

    #[test]
    fn test_compare_is_symmetric() {
        let scorer = SimilarityScorer::new();
        let ab = scorer.compare("qwerty123", "123qwerty", None, None);
        let ba = scorer.compare("123qwerty", "qwerty123", None, None);
        assert_eq!(ab.combined_score, ba.combined_score);
    }

    #[test]
    fn test_empty_basis_degrades_to_zero() {
        let result = SimilarityScorer::new().compare("___", "elham", None, None);
        assert_eq!(result.sequence_score, 0.0);
        assert_eq!(result.vector_score, 0.0);
        assert_eq!(result.verdict, "Unlikely same user");
        assert!(result.reasoning.contains("No comparable characters"));
    }

    #[test]
    fn test_platform_boost() {
        let a = presence(&[("GitHub", Some(true)), ("Reddit", Some(true)), ("VK", None)]);
        let b = presence(&[("GitHub", Some(true)), ("Reddit", None)]);
        let result = SimilarityScorer::new().compare("abc", "xyz", Some(&a), Some(&b));

        assert_eq!(result.shared_platforms, Some(1));
        assert_eq!(result.platforms_checked, Some(2));
        assert_eq!(result.combined_score, 15.0);
        assert!(result.reasoning.ends_with("1 shared platforms out of 2 checked."));
    }

    #[test]
    fn test_boost_is_capped() {
        let a = presence(&[("GitHub", Some(true))]);
        let result = SimilarityScorer::new().compare("elham", "elham", Some(&a), Some(&a));
        assert_eq!(result.combined_score, 100.0);
    }

    #[test]
    fn test_disjoint_presence_maps_add_nothing() {
        let a = presence(&[("GitHub", Some(true))]);
        let b = presence(&[("Reddit", Some(true))]);
        let overlap = PlatformOverlap::between(&a, &b);
        assert_eq!(overlap.checked, 0);
        assert_eq!(overlap.boost(), 0.0);
    }

    #[test]
    fn test_empty_presence_maps_add_no_platform_sentence() {
        let empty = PresenceMap::new();
        let result = SimilarityScorer::new().compare("elhamjvdi", "elham87jvdi", Some(&empty), Some(&empty));
        assert_eq!(result.platforms_checked, Some(0));
        assert!(!result.reasoning.contains("shared platforms"));
    }
}
