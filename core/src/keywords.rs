//! Class-conditional keyword extraction.
//!
//! Documents carry a class label; a term's keyword score for a class is the
//! estimated mutual information `A·N / ((A+C)(A+B))` over the contingency counts
//! `A` = class documents with the term, `B = N - A`, `C` = class documents without it.

use crate::association::Association;
use crate::topk::BoundedTopK;
use crate::DocId;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Default, Clone)]
pub struct ClassIndex {
    num_docs: u32,
    /// term → class → documents of that class containing the term
    term_class: BTreeMap<String, HashMap<String, u32>>,
    class_docs: BTreeMap<String, u32>,
    vocabulary: Option<HashSet<String>>,
}

impl ClassIndex {
    pub fn new() -> Self { Self::default() }

    /// Only terms in `vocabulary` are recorded.
    pub fn with_vocabulary<I, S>(vocabulary: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { vocabulary: Some(vocabulary.into_iter().map(Into::into).collect()), ..Self::default() }
    }

    /// Records one labelled document; repeated tokens count once.
    pub fn add_document<I, S>(&mut self, tokens: I, class: &str) -> DocId
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let doc_id = self.num_docs;
        let mut seen: HashSet<String> = HashSet::new();
        for token in tokens {
            let token = token.as_ref();
            if self.vocabulary.as_ref().is_some_and(|v| !v.contains(token)) {
                continue;
            }
            if seen.insert(token.to_owned()) {
                *self.term_class.entry(token.to_owned()).or_default().entry(class.to_owned()).or_insert(0) += 1;
            }
        }
        *self.class_docs.entry(class.to_owned()).or_insert(0) += 1;
        self.num_docs += 1;
        doc_id
    }

    pub fn get_num_docs(&self) -> u32 { self.num_docs }

    pub fn get_terms(&self) -> Vec<&str> {
        self.term_class.keys().map(String::as_str).collect()
    }

    pub fn get_classes(&self) -> Vec<&str> {
        self.class_docs.keys().map(String::as_str).collect()
    }

    /// Documents of `class` containing `term`.
    pub fn word_appear(&self, term: &str, class: &str) -> u32 {
        self.term_class.get(term).and_then(|c| c.get(class)).copied().unwrap_or(0)
    }

    pub fn class_count(&self, class: &str) -> u32 {
        self.class_docs.get(class).copied().unwrap_or(0)
    }

    /// Keyword score of `term` for `class`; 0.0 when any marginal is empty.
    pub fn estimate_mi(&self, class: &str, term: &str) -> f64 {
        let n = u64::from(self.num_docs);
        let a = u64::from(self.word_appear(term, class));
        let b = n - a;
        let c = u64::from(self.class_count(class)) - a;
        if a == 0 || a + c == 0 || a + b == 0 {
            return 0.0;
        }
        (a * n) as f64 / ((a + c) * (a + b)) as f64
    }

    /// Terms ranked by [`estimate_mi`](Self::estimate_mi) for `class`, best first.
    ///
    /// `Some(k)` keeps the k best; `None` ranks the whole vocabulary.
    pub fn find_top_word(&self, class: &str, k: Option<usize>) -> Vec<Association> {
        let scored = self.term_class.keys().map(|t| Association::new(t.as_str(), self.estimate_mi(class, t)));
        match k {
            Some(k) => {
                let mut heap = BoundedTopK::new(k);
                for assoc in scored {
                    heap.push(assoc);
                }
                heap.into_sorted_vec()
            }
            None => {
                let mut all: Vec<Association> = scored.collect();
                all.sort_by(|a, b| b.cmp(a));
                all
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labelled() -> ClassIndex {
        let mut idx = ClassIndex::new();
        idx.add_document("buy cheap pills cheap".split_whitespace(), "spam");
        idx.add_document("cheap offer".split_whitespace(), "spam");
        idx.add_document("meeting today".split_whitespace(), "ham");
        idx.add_document("cheap lunch meeting".split_whitespace(), "ham");
        idx
    }

    #[test]
    fn counts_documents_per_class() {
        let idx = labelled();
        assert_eq!(idx.get_num_docs(), 4);
        assert_eq!(idx.word_appear("cheap", "spam"), 2);
        assert_eq!(idx.word_appear("cheap", "ham"), 1);
        assert_eq!(idx.class_count("spam"), 2);
        assert_eq!(idx.get_classes(), vec!["ham", "spam"]);
    }

    #[test]
    fn estimate_follows_contingency_counts() {
        let idx = labelled();
        // A = 2, N = 4, A + C = 2, A + B = 4
        assert_eq!(idx.estimate_mi("spam", "cheap"), 1.0);
        assert_eq!(idx.estimate_mi("spam", "buy"), 0.5);
    }

    #[test]
    fn absent_counts_score_zero() {
        let idx = labelled();
        assert_eq!(idx.estimate_mi("spam", "meeting"), 0.0);
        assert_eq!(idx.estimate_mi("spam", "unknown"), 0.0);
        assert_eq!(idx.estimate_mi("nope", "cheap"), 0.0);
        assert_eq!(ClassIndex::new().estimate_mi("spam", "cheap"), 0.0);
    }

    #[test]
    fn top_words_rank_with_alphabetical_ties() {
        let idx = labelled();
        let top: Vec<(String, f64)> =
            idx.find_top_word("spam", Some(2)).into_iter().map(|a| (a.partner, a.score)).collect();
        assert_eq!(top, vec![("cheap".to_string(), 1.0), ("buy".to_string(), 0.5)]);

        let all: Vec<String> = idx.find_top_word("spam", None).into_iter().map(|a| a.partner).collect();
        assert_eq!(all, vec!["cheap", "buy", "offer", "pills", "lunch", "meeting", "today"]);
    }

    #[test]
    fn vocabulary_filters_terms() {
        let mut idx = ClassIndex::with_vocabulary(["cheap"]);
        idx.add_document(["cheap", "offer"], "spam");
        assert_eq!(idx.get_terms(), vec!["cheap"]);
        assert_eq!(idx.class_count("spam"), 1);
    }
}
