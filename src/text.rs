//! String comparison primitives
//!
//! - `normalize`: lower-case and strip to `[a-z0-9]`
//! - `sequence_ratio`: Ratcliff/Obershelp matching-block ratio, 2*M/T
//! - `NgramVectorizer`: character n-gram TF-IDF vector space (smoothed idf,
//!   L2-normalized rows) with sparse cosine similarity
//!
//! The vectorizer is fitted either per call on the two strings being compared
//! or once on a training corpus and persisted. Both strategies live on top of
//! the same type but are exposed separately (see `similarity` and `trainer`).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Lower-case and keep only ASCII letters and digits
pub fn normalize(username: &str) -> String {
    username
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

// ── Sequence matching ────────────────────────────────────────────────────

/// Similarity ratio in [0, 1] from the longest matching blocks of `a` and `b`.
///
/// Both argument orders are evaluated and the larger match count is used, so
/// the ratio is symmetric. Two empty strings compare as 1.0.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = matching_chars(&a, &b).max(matching_chars(&b, &a));
    2.0 * matches as f64 / total as f64
}

/// Total size of the matching blocks found by recursive longest-match splitting
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, &c) in b.iter().enumerate() {
        b2j.entry(c).or_default().push(j);
    }

    let mut total = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    total
}

/// Longest common block inside `a[alo..ahi]` and `b[blo..bhi]`.
/// Ties resolve to the earliest start in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // j2len[j] = length of the match ending at a[i-1] and b[j]
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next.insert(j, k);
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            }
        }
        j2len = next;
    }

    (best_i, best_j, best_k)
}

// ── Character n-gram vector space ────────────────────────────────────────

/// Inclusive n-gram length range
pub const NGRAM_RANGE: (usize, usize) = (2, 4);

/// Sparse L2-normalized row: (term index, weight), sorted by index
pub type SparseVector = Vec<(usize, f64)>;

/// Character n-gram TF-IDF vectorizer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NgramVectorizer {
    /// n-gram -> column index (sorted for stable serialization)
    vocabulary: BTreeMap<String, usize>,
    /// Smoothed inverse document frequency per column
    idf: Vec<f64>,
}

impl NgramVectorizer {
    /// Fit the vocabulary and idf weights on a corpus.
    /// Documents are lower-cased before n-gram extraction.
    pub fn fit<S: AsRef<str>>(corpus: &[S]) -> Self {
        let mut doc_freq: BTreeMap<String, usize> = BTreeMap::new();
        for doc in corpus {
            let mut grams: Vec<String> = ngram_counts(doc.as_ref()).into_keys().collect();
            grams.sort_unstable();
            grams.dedup();
            for gram in grams {
                *doc_freq.entry(gram).or_insert(0) += 1;
            }
        }

        let n_docs = corpus.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(doc_freq.len());
        for (index, (gram, df)) in doc_freq.into_iter().enumerate() {
            vocabulary.insert(gram, index);
            idf.push(((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0);
        }

        Self { vocabulary, idf }
    }

    /// Project a document into the fitted space. Unknown n-grams are ignored.
    pub fn transform(&self, doc: &str) -> SparseVector {
        let mut row: SparseVector = ngram_counts(doc)
            .into_iter()
            .filter_map(|(gram, count)| {
                self.vocabulary
                    .get(&gram)
                    .map(|&col| (col, count as f64 * self.idf[col]))
            })
            .collect();
        row.sort_unstable_by_key(|&(col, _)| col);

        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in row.iter_mut() {
                *w /= norm;
            }
        }
        row
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Count n-grams of every length in [`NGRAM_RANGE`]
fn ngram_counts(doc: &str) -> HashMap<String, usize> {
    let chars: Vec<char> = doc.to_lowercase().chars().collect();
    let mut counts = HashMap::new();
    for n in NGRAM_RANGE.0..=NGRAM_RANGE.1 {
        for window in chars.windows(n) {
            *counts.entry(window.iter().collect::<String>()).or_insert(0) += 1;
        }
    }
    counts
}

/// Cosine similarity of two L2-normalized sparse rows, clamped to [0, 1]
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut dot = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot.clamp(0.0, 1.0)
}
