use crate::{DocId, Error, Result};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Documents containing one term, ascending by doc id.
#[derive(Debug, Default, Clone)]
pub struct PostingList {
    docs: Vec<DocId>,
    /// Memoized document frequency, only ever filled once the index is frozen.
    df: OnceLock<u32>,
}

impl PostingList {
    pub(crate) fn from_sorted(docs: Vec<DocId>) -> Self {
        Self { docs, df: OnceLock::new() }
    }

    pub fn docs(&self) -> &[DocId] { &self.docs }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Writable,
    Frozen,
}

/// Term → document presence index.
///
/// Written during ingestion, then frozen before any association pass reads it.
#[derive(Debug, Clone)]
pub struct InvertedIndex {
    postings: BTreeMap<String, PostingList>,
    num_docs: u32,
    phase: Phase,
}

impl Default for InvertedIndex {
    fn default() -> Self {
        Self { postings: BTreeMap::new(), num_docs: 0, phase: Phase::Writable }
    }
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub(crate) fn from_parts(postings: BTreeMap<String, Vec<DocId>>, num_docs: u32) -> Self {
        let postings = postings.into_iter().map(|(t, d)| (t, PostingList::from_sorted(d))).collect();
        Self { postings, num_docs, phase: Phase::Writable }
    }

    /// Records one document and returns its id.
    ///
    /// Ids start at 0 and advance by one per call, even for an empty token set.
    /// A token repeated within the same call is recorded once.
    pub fn add_document<I, S>(&mut self, tokens: I) -> Result<DocId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.phase == Phase::Frozen {
            return Err(Error::IndexFrozen);
        }
        let doc_id = self.num_docs;
        for token in tokens {
            let list = self.postings.entry(token.as_ref().to_owned()).or_default();
            // doc_id is the largest id so far, so a repeat can only be the tail.
            if list.docs.last() != Some(&doc_id) {
                list.docs.push(doc_id);
            }
        }
        self.num_docs += 1;
        Ok(doc_id)
    }

    /// Ends the write phase. Idempotent.
    pub fn freeze(&mut self) {
        if self.phase == Phase::Writable {
            tracing::debug!(num_docs = self.num_docs, num_terms = self.postings.len(), "index frozen");
        }
        self.phase = Phase::Frozen;
    }

    pub fn is_frozen(&self) -> bool { self.phase == Phase::Frozen }

    pub fn phase(&self) -> Phase { self.phase }

    /// Number of documents holding both terms, by merging the two posting lists.
    pub fn concurrence(&self, t1: &str, t2: &str) -> u32 {
        let (Some(p1), Some(p2)) = (self.postings.get(t1), self.postings.get(t2)) else {
            return 0;
        };
        intersect_count(&p1.docs, &p2.docs)
    }

    /// Document frequency of `term`, 0 when unseen.
    pub fn word_appear(&self, term: &str) -> u32 {
        let Some(list) = self.postings.get(term) else {
            return 0;
        };
        match self.phase {
            Phase::Frozen => *list.df.get_or_init(|| list.docs.len() as u32),
            Phase::Writable => list.docs.len() as u32,
        }
    }

    /// All indexed terms, ascending.
    pub fn get_terms(&self) -> Vec<&str> {
        self.postings.keys().map(String::as_str).collect()
    }

    pub fn get_num_docs(&self) -> u32 { self.num_docs }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn postings(&self, term: &str) -> &[DocId] {
        self.postings.get(term).map(|l| l.docs()).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DocId])> {
        self.postings.iter().map(|(t, l)| (t.as_str(), l.docs()))
    }
}

fn intersect_count(a: &[DocId], b: &[DocId]) -> u32 {
    let (mut i, mut j, mut count) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                count += 1;
                i += 1;
                j += 1;
            }
        }
    }
    count
}
