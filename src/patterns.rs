//! Rule-based username pattern analysis
//!
//! Heuristic signals (role keywords, digits, separators, repeated runs,
//! entropy bucket) and a verdict. Signal order matters only for the
//! explanation list; the verdict is computed from the raw facts.

use crate::entropy::{round_to, shannon_entropy, EntropyClass, PATTERN_SCALE};
use serde::{Deserialize, Serialize};

/// Role-based keywords, matched as case-insensitive substrings
pub const GENERIC_KEYWORDS: &[&str] = &[
    "admin", "root", "test", "user", "support", "info", "contact", "guest", "service",
];

const SHORT_LENGTH: usize = 5;
const MANY_DIGITS: usize = 3;
const REPEAT_RUN: usize = 3;

/// A qualitative signal raised by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternSignal {
    GenericKeyword,
    VeryShort,
    ManyDigits,
    SomeDigits,
    Separators,
    RepeatedCharacters,
    Entropy(EntropyClass),
    NoPattern,
}

impl PatternSignal {
    pub fn description(&self) -> &'static str {
        match self {
            Self::GenericKeyword => "Contains generic or role-based keyword.",
            Self::VeryShort => "Very short username, likely personal or early adopter.",
            Self::ManyDigits => "Contains many digits, possible auto-generated or spammy.",
            Self::SomeDigits => "Contains digits, maybe birth year or lucky numbers.",
            Self::Separators => {
                "Uses separators (underscore/dot/dash), common in personal accounts."
            }
            Self::RepeatedCharacters => "Has repeated characters, maybe stylized or bot-generated.",
            Self::Entropy(EntropyClass::Low) => "Low entropy: predictable, simple structure.",
            Self::Entropy(EntropyClass::Medium) => "Moderate entropy: balanced complexity.",
            Self::Entropy(EntropyClass::High) => "High entropy: complex or random structure.",
            Self::NoPattern => "No obvious patterns detected; likely personal account.",
        }
    }
}

impl std::fmt::Display for PatternSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternVerdict {
    GenericRoleBased,
    PossiblyAutomated,
    LikelyPersonal,
}

impl std::fmt::Display for PatternVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::GenericRoleBased => "Generic/role-based",
            Self::PossiblyAutomated => "Possibly automated",
            Self::LikelyPersonal => "Likely personal",
        })
    }
}

/// Analyzer output
#[derive(Debug, Clone, Serialize)]
pub struct PatternReport {
    pub username: String,
    /// Entropy of the lower-cased handle, 2 decimal places
    pub entropy: f64,
    pub signals: Vec<String>,
    pub verdict: String,
    #[serde(skip)]
    pub raw_signals: Vec<PatternSignal>,
    #[serde(skip)]
    pub raw_verdict: Option<PatternVerdict>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PatternAnalyzer;

impl PatternAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Signals in evaluation order
    pub fn signals(&self, username: &str) -> Vec<PatternSignal> {
        let lower = username.to_lowercase();
        let mut signals = Vec::new();

        if contains_generic_keyword(&lower) {
            signals.push(PatternSignal::GenericKeyword);
        }

        if lower.chars().count() <= SHORT_LENGTH {
            signals.push(PatternSignal::VeryShort);
        }

        let digits = digit_count(&lower);
        if digits > MANY_DIGITS {
            signals.push(PatternSignal::ManyDigits);
        } else if digits >= 1 {
            signals.push(PatternSignal::SomeDigits);
        }

        if lower.contains(['_', '.', '-']) {
            signals.push(PatternSignal::Separators);
        }

        if longest_run(&lower) >= REPEAT_RUN {
            signals.push(PatternSignal::RepeatedCharacters);
        }

        signals.push(PatternSignal::Entropy(
            PATTERN_SCALE.classify(shannon_entropy(&lower)),
        ));

        if signals.is_empty() {
            signals.push(PatternSignal::NoPattern);
        }
        signals
    }

    /// Verdict from the underlying facts, independent of signal ordering
    pub fn verdict(&self, username: &str) -> PatternVerdict {
        let lower = username.to_lowercase();
        if contains_generic_keyword(&lower) {
            PatternVerdict::GenericRoleBased
        } else if digit_count(&lower) > MANY_DIGITS {
            PatternVerdict::PossiblyAutomated
        } else {
            PatternVerdict::LikelyPersonal
        }
    }

    pub fn analyze(&self, username: &str) -> PatternReport {
        let lower = username.to_lowercase();
        let raw_signals = self.signals(username);
        let verdict = self.verdict(username);

        PatternReport {
            username: username.to_string(),
            entropy: round_to(shannon_entropy(&lower), 2),
            signals: raw_signals.iter().map(|s| s.to_string()).collect(),
            verdict: verdict.to_string(),
            raw_signals,
            raw_verdict: Some(verdict),
        }
    }
}

fn contains_generic_keyword(lower: &str) -> bool {
    GENERIC_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn digit_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_ascii_digit()).count()
}

/// Length of the longest run of one repeated character
fn longest_run(s: &str) -> usize {
    let mut best = 0;
    let mut current = 0;
    let mut prev: Option<char> = None;
    for c in s.chars() {
        if Some(c) == prev {
            current += 1;
        } else {
            current = 1;
            prev = Some(c);
        }
        best = best.max(current);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_keyword_wins_verdict() {
        let report = PatternAnalyzer::new().analyze("admin1234");
        assert_eq!(report.verdict, "Generic/role-based");
        assert_eq!(report.raw_signals[0], PatternSignal::GenericKeyword);
        assert!(report.raw_signals.contains(&PatternSignal::ManyDigits));
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let analyzer = PatternAnalyzer::new();
        assert_eq!(analyzer.verdict("SuperADMIN"), PatternVerdict::GenericRoleBased);
        assert_eq!(analyzer.verdict("MyGuestBook"), PatternVerdict::GenericRoleBased);
    }

    #[test]
    fn test_many_digits_is_automated() {
        let analyzer = PatternAnalyzer::new();
        assert_eq!(analyzer.verdict("bot9999"), PatternVerdict::PossiblyAutomated);
        assert_eq!(analyzer.verdict("elham87"), PatternVerdict::LikelyPersonal);
    }

    #[test]
    fn test_personal_handle() {
        let report = PatternAnalyzer::new().analyze("elhamjvdi");
        assert_eq!(report.verdict, "Likely personal");
        assert_eq!(
            report.raw_signals,
            vec![PatternSignal::Entropy(EntropyClass::Medium)]
        );
        assert_eq!(report.entropy, 3.17);
    }

    #[test]
    fn test_separators_and_repeats() {
        let signals = PatternAnalyzer::new().signals("xX_dark.lord_99_Xx");
        assert!(signals.contains(&PatternSignal::Separators));
        assert!(signals.contains(&PatternSignal::SomeDigits));
        assert!(!signals.contains(&PatternSignal::RepeatedCharacters));

        let signals = PatternAnalyzer::new().signals("aaaabbb");
        assert!(signals.contains(&PatternSignal::RepeatedCharacters));
        assert!(signals.contains(&PatternSignal::Entropy(EntropyClass::Low)));
    }

    #[test]
    fn test_entropy_signal_uses_pattern_scale() {
        // 12 distinct chars -> log2(12) ~ 3.58, High on the pattern scale only
        let signals = PatternAnalyzer::new().signals("abcdefghijkl");
        assert!(signals.contains(&PatternSignal::Entropy(EntropyClass::High)));
    }

    #[test]
    fn test_entropy_signal_always_present() {
        let signals = PatternAnalyzer::new().signals("");
        assert!(signals.contains(&PatternSignal::VeryShort));
        assert!(signals.contains(&PatternSignal::Entropy(EntropyClass::Low)));
        assert!(!signals.contains(&PatternSignal::NoPattern));
    }

    #[test]
    fn test_longest_run() {
        assert_eq!(longest_run(""), 0);
        assert_eq!(longest_run("abc"), 1);
        assert_eq!(longest_run("abbbc"), 3);
    }
}
