//! Pairwise term association over an [`InvertedIndex`].
//!
//! Scores are derived from document presence counts only:
//! `c` = concurrence(t1, t2), `n` = number of documents,
//! `a` / `b` = document frequency of t1 / t2.

use crate::index::InvertedIndex;
use crate::topk::BoundedTopK;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

#[cfg(feature = "parallel")]
use parking_lot::Mutex;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One ranked partner of a term.
///
/// Ordered by score, then by partner name reversed, so that in a descending
/// ranking equal scores list partners alphabetically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
    pub partner: String,
    pub score: f64,
}

impl Association {
    pub fn new(partner: impl Into<String>, score: f64) -> Self {
        Self { partner: partner.into(), score }
    }
}

fn cmp_score(a: f64, b: f64) -> Ordering {
    // -inf equals -inf and -0.0 equals 0.0; NaN falls back to the IEEE total order.
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

impl Ord for Association {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_score(self.score, other.score).then_with(|| other.partner.cmp(&self.partner))
    }
}

impl PartialOrd for Association {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Association {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Association {}

impl fmt::Display for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.partner, self.score)
    }
}

/// PMI from raw counts; `-inf` when there is no evidence of association.
pub fn pmi_from_counts(c: u32, n: u32, a: u32, b: u32) -> f64 {
    if a == 0 || b == 0 {
        return f64::NEG_INFINITY;
    }
    let ratio = f64::from(c) * f64::from(n) / (f64::from(a) * f64::from(b));
    if ratio == 0.0 {
        f64::NEG_INFINITY
    } else {
        ratio.log2()
    }
}

/// PMI divided by `-log2 p(t1, t2)`.
///
/// Returns `-1` when the terms never co-occur and `+1` when they co-occur in
/// every document (the joint log probability is 0).
pub fn npmi_from_counts(c: u32, n: u32, a: u32, b: u32) -> f64 {
    if a == 0 || b == 0 || c == 0 || n == 0 {
        return -1.0;
    }
    let ratio = f64::from(c) * f64::from(n) / (f64::from(a) * f64::from(b));
    let joint = (f64::from(c) / f64::from(n)).log2();
    if joint == 0.0 {
        return 1.0;
    }
    ratio.log2() / -joint
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    #[default]
    Pmi,
    Npmi,
}

impl Measure {
    pub fn score_counts(self, c: u32, n: u32, a: u32, b: u32) -> f64 {
        match self {
            Measure::Pmi => pmi_from_counts(c, n, a, b),
            Measure::Npmi => npmi_from_counts(c, n, a, b),
        }
    }

    pub fn score(self, index: &InvertedIndex, t1: &str, t2: &str) -> f64 {
        self.score_counts(
            index.concurrence(t1, t2),
            index.get_num_docs(),
            index.word_appear(t1),
            index.word_appear(t2),
        )
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Measure::Pmi => "pmi",
            Measure::Npmi => "npmi",
        })
    }
}

impl FromStr for Measure {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pmi" => Ok(Measure::Pmi),
            "npmi" => Ok(Measure::Npmi),
            other => Err(format!("unknown measure {other:?}, expected pmi or npmi")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssociationConfig {
    /// Partners kept per term.
    pub top_k: usize,
    pub measure: Measure,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self { top_k: 50, measure: Measure::Pmi }
    }
}

impl AssociationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be at least 1"));
        }
        Ok(())
    }
}

/// Materialized result of a build, detached from the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationTable {
    pub measure: Measure,
    pub top_k: usize,
    entries: BTreeMap<String, Vec<Association>>,
}

impl AssociationTable {
    /// Partners of `term`, best first; empty for unknown terms.
    pub fn get(&self, term: &str) -> &[Association] {
        self.entries.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

/// Builds and serves per-term top-K association tables.
///
/// Starts unbuilt; [`build`](Self::build) moves it to built exactly once.
/// [`reset`](Self::reset) is the only way back.
pub struct AssociationEngine<'a> {
    index: &'a InvertedIndex,
    config: AssociationConfig,
    tables: Option<BTreeMap<&'a str, BoundedTopK<Association>>>,
}

impl<'a> AssociationEngine<'a> {
    pub fn new(index: &'a InvertedIndex, config: AssociationConfig) -> Result<Self> {
        if !index.is_frozen() {
            return Err(Error::IndexNotFrozen);
        }
        config.validate()?;
        Ok(Self { index, config, tables: None })
    }

    pub fn index(&self) -> &'a InvertedIndex { self.index }

    pub fn config(&self) -> &AssociationConfig { &self.config }

    pub fn is_built(&self) -> bool { self.tables.is_some() }

    /// Score of the pair under the configured measure.
    pub fn score(&self, t1: &str, t2: &str) -> f64 {
        self.config.measure.score(self.index, t1, t2)
    }

    pub fn pmi(&self, t1: &str, t2: &str) -> f64 {
        Measure::Pmi.score(self.index, t1, t2)
    }

    pub fn npmi(&self, t1: &str, t2: &str) -> f64 {
        Measure::Npmi.score(self.index, t1, t2)
    }

    /// Scores every unordered term pair once and records it for both terms.
    pub fn build(&mut self) -> Result<()> {
        if self.tables.is_some() {
            return Err(Error::AlreadyBuilt);
        }
        let index: &'a InvertedIndex = self.index;
        let terms = index.get_terms();
        let num_terms = terms.len();
        let pairs = num_terms * num_terms.saturating_sub(1) / 2;
        tracing::info!(num_terms, pairs, measure = %self.config.measure, top_k = self.config.top_k, "building association tables");

        let start = Instant::now();
        let rows = self.score_pairs(&terms);
        self.tables = Some(terms.into_iter().zip(rows).collect());

        tracing::info!(num_terms, took_s = start.elapsed().as_secs_f64(), "association tables built");
        Ok(())
    }

    /// Each worker owns row `i`: it keeps term i's candidates locally and only
    /// locks the partner's slot. The row is merged into slot i at the end.
    #[cfg(feature = "parallel")]
    fn score_pairs(&self, terms: &[&str]) -> Vec<BoundedTopK<Association>> {
        let k = self.config.top_k;
        let slots: Vec<Mutex<BoundedTopK<Association>>> =
            (0..terms.len()).map(|_| Mutex::new(BoundedTopK::new(k))).collect();

        (0..terms.len()).into_par_iter().for_each(|i| {
            let mut row = BoundedTopK::new(k);
            for j in (i + 1)..terms.len() {
                let score = self.score(terms[i], terms[j]);
                row.push(Association::new(terms[j], score));
                slots[j].lock().push(Association::new(terms[i], score));
            }
            let mut slot = slots[i].lock();
            for assoc in row.into_sorted_vec() {
                slot.push(assoc);
            }
        });

        slots.into_iter().map(Mutex::into_inner).collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn score_pairs(&self, terms: &[&str]) -> Vec<BoundedTopK<Association>> {
        let k = self.config.top_k;
        let mut slots: Vec<BoundedTopK<Association>> = (0..terms.len()).map(|_| BoundedTopK::new(k)).collect();
        for i in 0..terms.len() {
            for j in (i + 1)..terms.len() {
                let score = self.score(terms[i], terms[j]);
                slots[i].push(Association::new(terms[j], score));
                slots[j].push(Association::new(terms[i], score));
            }
        }
        slots
    }

    /// Drops the tables so that `build` may run again.
    pub fn reset(&mut self) {
        self.tables = None;
    }

    /// Best partners of `term`, at most `top_k`, descending. Empty before `build`.
    pub fn get_top_association(&self, term: &str) -> Vec<Association> {
        self.tables
            .as_ref()
            .and_then(|t| t.get(term))
            .map(BoundedTopK::topk)
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> Option<AssociationTable> {
        let tables = self.tables.as_ref()?;
        let entries = tables.iter().map(|(term, heap)| (term.to_string(), heap.topk())).collect();
        Some(AssociationTable { measure: self.config.measure, top_k: self.config.top_k, entries })
    }

    /// Mutual information between two token sequences:
    /// `sum p(t1,t2) * PMI(t1,t2)` over their cross product.
    ///
    /// Pairs that never co-occur contribute nothing.
    pub fn compute_mi<A: AsRef<str>, B: AsRef<str>>(&self, s1: &[A], s2: &[B]) -> f64 {
        let n = self.index.get_num_docs();
        let mut mi = 0.0;
        self.for_each_joint(s1, s2, |t1, t2, c, p| {
            let pmi = pmi_from_counts(c, n, self.index.word_appear(t1), self.index.word_appear(t2));
            mi += p * pmi;
        });
        mi
    }

    /// [`compute_mi`](Self::compute_mi) divided by the joint entropy
    /// `-sum p log2 p`; 0 when either is 0.
    pub fn compute_nmi<A: AsRef<str>, B: AsRef<str>>(&self, s1: &[A], s2: &[B]) -> f64 {
        let mi = self.compute_mi(s1, s2);
        let mut plogp = 0.0;
        self.for_each_joint(s1, s2, |_, _, _, p| plogp += p * p.log2());
        if mi == 0.0 || plogp == 0.0 {
            0.0
        } else {
            mi / -plogp
        }
    }

    fn for_each_joint<A, B, F>(&self, s1: &[A], s2: &[B], mut f: F)
    where
        A: AsRef<str>,
        B: AsRef<str>,
        F: FnMut(&str, &str, u32, f64),
    {
        let n = self.index.get_num_docs();
        if n == 0 {
            return;
        }
        for t1 in s1 {
            for t2 in s2 {
                let (t1, t2) = (t1.as_ref(), t2.as_ref());
                let c = self.index.concurrence(t1, t2);
                if c > 0 {
                    f(t1, t2, c, f64::from(c) / f64::from(n));
                }
            }
        }
    }
}
