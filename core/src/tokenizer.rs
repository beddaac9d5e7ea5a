use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerMode {
    /// Split on whitespace, keep case and punctuation.
    #[default]
    Whitespace,
    /// NFKC, lowercase, word regex and English stemming.
    Normalized,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub mode: TokenizerMode,
    #[serde(default)]
    pub builtin_stopwords: bool,
    #[serde(default)]
    pub stopwords: BTreeSet<String>,
}

/// Turns raw text into terms, dropping stopwords before they reach the index.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self { Self { config } }

    pub fn config(&self) -> &TokenizerConfig { &self.config }

    fn is_stopword(&self, token: &str) -> bool {
        (self.config.builtin_stopwords && STOPWORDS.contains(token)) || self.config.stopwords.contains(token)
    }

    /// Terms in document order, repeats kept.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let raw = match self.config.mode {
            TokenizerMode::Whitespace => text.split_whitespace().map(str::to_owned).collect(),
            TokenizerMode::Normalized => normalized_words(text),
        };
        raw.into_iter().filter(|t| !self.is_stopword(t)).map(|t| self.finish(t)).collect()
    }

    /// Distinct terms of `text`, the shape `InvertedIndex::add_document` wants.
    pub fn term_set(&self, text: &str) -> BTreeSet<String> {
        self.tokenize(text).into_iter().collect()
    }

    fn finish(&self, token: String) -> String {
        match self.config.mode {
            TokenizerMode::Whitespace => token,
            TokenizerMode::Normalized => STEMMER.stem(&token).into_owned(),
        }
    }
}

fn normalized_words(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized).map(|m| m.as_str().to_owned()).collect()
}

/// Reads one stopword per line, ignoring blank lines.
pub fn load_stopwords<P: AsRef<Path>>(path: P) -> std::io::Result<BTreeSet<String>> {
    let text = fs::read_to_string(path)?;
    Ok(text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_owned).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_keeps_case() {
        let t = Tokenizer::default();
        assert_eq!(t.tokenize("Rust  rust\tRUST"), vec!["Rust", "rust", "RUST"]);
    }

    #[test]
    fn normalized_stems() {
        let t = Tokenizer::new(TokenizerConfig { mode: TokenizerMode::Normalized, ..Default::default() });
        let words = t.tokenize("Running, runner's run!");
        assert!(words.iter().any(|w| w == "run"));
    }

    #[test]
    fn term_set_collapses_repeats() {
        let t = Tokenizer::default();
        let set = t.term_set("b a b a");
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn custom_stopwords_are_dropped() {
        let stopwords = ["the".to_string()].into_iter().collect();
        let t = Tokenizer::new(TokenizerConfig { stopwords, ..Default::default() });
        assert_eq!(t.tokenize("the cat the hat"), vec!["cat", "hat"]);
    }
}
