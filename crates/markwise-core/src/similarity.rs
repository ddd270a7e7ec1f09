//! Lexical similarity between a candidate answer and a reference answer.
//!
//! Cosine similarity over length-normalized term frequencies, plus a
//! token-set Jaccard overlap used as a lightweight stand-in for semantic
//! comparison.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Tokens shorter than this are ignored by the term-frequency model.
pub const MIN_TERM_LEN: usize = 3;

/// Result of comparing a candidate text against a reference text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// Cosine similarity in [0.0, 1.0], rounded to two decimals.
    pub similarity: f64,
    /// Terms present in both texts, in order of first use by the candidate.
    pub matched_keywords: Vec<String>,
    /// Reference terms the candidate never used, in reference order.
    pub missing_keywords: Vec<String>,
}

/// Lowercase `text`, treat every non-alphanumeric character as a separator,
/// and return the resulting tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tokens that participate in the term-frequency model.
fn terms(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|token| token.chars().count() >= MIN_TERM_LEN)
        .collect()
}

/// Term frequencies normalized by token count, with first-seen term order.
struct TermFrequencies {
    order: Vec<String>,
    freq: HashMap<String, f64>,
}

impl TermFrequencies {
    fn from_terms(terms: Vec<String>) -> Self {
        let total = terms.len() as f64;
        let mut order = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for term in terms {
            let count = counts.entry(term.clone()).or_insert(0);
            if *count == 0 {
                order.push(term);
            }
            *count += 1;
        }
        let freq = counts
            .into_iter()
            .map(|(term, count)| (term, count as f64 / total))
            .collect();
        Self { order, freq }
    }

    fn get(&self, term: &str) -> f64 {
        self.freq.get(term).copied().unwrap_or(0.0)
    }

    fn norm(&self) -> f64 {
        self.order
            .iter()
            .map(|term| self.get(term).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

/// Compare `candidate` against `reference`.
///
/// Total: empty or term-less input yields a similarity of 0.
pub fn score(candidate: &str, reference: &str) -> SimilarityResult {
    let cand = TermFrequencies::from_terms(terms(candidate));
    let refr = TermFrequencies::from_terms(terms(reference));

    // Sorted iteration keeps the dot product independent of argument order.
    let shared: BTreeSet<&String> = cand
        .order
        .iter()
        .filter(|term| refr.freq.contains_key(*term))
        .collect();
    let dot: f64 = shared
        .iter()
        .map(|term| cand.get(term) * refr.get(term))
        .sum();

    let norms = cand.norm() * refr.norm();
    let similarity = if norms == 0.0 {
        0.0
    } else {
        (dot / norms).clamp(0.0, 1.0)
    };

    let matched_keywords = cand
        .order
        .iter()
        .filter(|term| refr.freq.contains_key(*term))
        .cloned()
        .collect();
    let missing_keywords = refr
        .order
        .iter()
        .filter(|term| !cand.freq.contains_key(*term))
        .cloned()
        .collect();

    SimilarityResult {
        similarity: (similarity * 100.0).round() / 100.0,
        matched_keywords,
        missing_keywords,
    }
}

/// Jaccard index of the two texts' token sets, as a rounded percentage.
///
/// No length filtering is applied. Two texts without any tokens score 0.
pub fn semantic_overlap(candidate: &str, reference: &str) -> u32 {
    let a: HashSet<String> = tokenize(candidate).into_iter().collect();
    let b: HashSet<String> = tokenize(reference).into_iter().collect();

    let union = a.union(&b).count();
    if union == 0 {
        return 0;
    }
    let intersection = a.intersection(&b).count();
    (intersection as f64 / union as f64 * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = "Normalization organizes database tables to reduce redundancy \
                             and improve data integrity through normal forms.";

    #[test]
    fn tokenize_strips_punctuation_and_case() {
        assert_eq!(
            tokenize("Hello, World! It's 2024."),
            vec!["hello", "world", "it", "s", "2024"]
        );
    }

    #[test]
    fn terms_drop_short_tokens() {
        assert_eq!(terms("a an the of database"), vec!["the", "database"]);
    }

    #[test]
    fn identical_texts_score_one() {
        let result = score(REFERENCE, REFERENCE);
        assert_eq!(result.similarity, 1.0);
        assert!(result.missing_keywords.is_empty());
        assert_eq!(result.matched_keywords[0], "normalization");
    }

    #[test]
    fn score_is_symmetric() {
        let candidate = "Normalization reduces redundancy in database tables, a lot of redundancy.";
        assert_eq!(
            score(candidate, REFERENCE).similarity,
            score(REFERENCE, candidate).similarity
        );
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(score("", REFERENCE).similarity, 0.0);
        assert_eq!(score(REFERENCE, "").similarity, 0.0);
        assert_eq!(score("", "").similarity, 0.0);
        // Only short tokens: no terms, still no division error.
        assert_eq!(score("a b c", "to be or").similarity, 0.0);
    }

    #[test]
    fn disjoint_texts_score_zero() {
        let result = score("photosynthesis chlorophyll", "mitochondria respiration");
        assert_eq!(result.similarity, 0.0);
        assert!(result.matched_keywords.is_empty());
        assert_eq!(
            result.missing_keywords,
            vec!["mitochondria", "respiration"]
        );
    }

    #[test]
    fn matched_and_missing_keywords() {
        let result = score("Normalization removes redundancy.", REFERENCE);
        assert_eq!(result.matched_keywords, vec!["normalization", "redundancy"]);
        assert!(result.missing_keywords.contains(&"database".to_string()));
        assert!(!result.missing_keywords.contains(&"removes".to_string()));
        assert!(result.similarity > 0.0 && result.similarity < 1.0);
    }

    #[test]
    fn similarity_is_rounded_to_two_decimals() {
        // cand = {alpha: 1/2, beta: 1/2}, ref = {alpha: 1/3, gamma: 2/3}
        // cos = (1/6) / (sqrt(1/2) * sqrt(5/9)) = 0.3162...
        let result = score("alpha beta", "alpha gamma gamma");
        assert_eq!(result.similarity, 0.32);
    }

    #[test]
    fn overlap_identical_sets_is_hundred() {
        assert_eq!(semantic_overlap("The cat sat", "sat the CAT"), 100);
    }

    #[test]
    fn overlap_counts_short_tokens() {
        // {a, b} vs {a, c}: 1 shared of 3.
        assert_eq!(semantic_overlap("a b", "a c"), 33);
    }

    #[test]
    fn overlap_is_bounded() {
        for (a, b) in [
            ("", ""),
            ("", "text"),
            ("one two three", "four five"),
            ("same same", "same"),
        ] {
            let value = semantic_overlap(a, b);
            assert!(value <= 100, "{a:?} vs {b:?} gave {value}");
        }
        assert_eq!(semantic_overlap("", ""), 0);
        assert_eq!(semantic_overlap("one two", "three"), 0);
    }
}
