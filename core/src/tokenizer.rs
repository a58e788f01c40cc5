use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

use crate::{Error, Result, Term};

lazy_static! {
    static ref PUNCT: Regex =
        Regex::new(r#"[,.\-!?:;()\[\]{}<>\\/|@#$%^&*_+=~`'"´‘’“”]"#).expect("valid regex");
}

const ENGLISH: &[&str] = &[
    "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","cannot","could",
    "did","do","does","doing","down","during",
    "each","few","for","from","further",
    "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
    "i","if","in","into","is","it","its","itself",
    "me","more","most","my","myself",
    "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
    "same","she","should","so","some","such",
    "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
    "under","until","up","very",
    "was","we","were","what","when","where","which","while","who","whom","why","with","would",
    "you","your","yours","yourself","yourselves",
];

/// Read-only stopword configuration, built once and handed to a [`Normalizer`].
#[derive(Clone, Default)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The embedded English list.
    pub fn english() -> Self {
        Self { words: ENGLISH.iter().map(|w| w.to_string()).collect() }
    }

    /// One term per line. Blank lines are ignored; entries are lowercased.
    pub fn parse(text: &str) -> Self {
        let words = text
            .lines()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        Self { words }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read stopword list {}: {e}", path.display()))
        })?;
        let stopwords = Self::parse(&text);
        tracing::info!(path = %path.display(), count = stopwords.len(), "loaded stopwords");
        Ok(stopwords)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl fmt::Debug for Stopwords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stopwords").field("len", &self.words.len()).finish()
    }
}

/// Strip punctuation, split on whitespace, lowercase. Token order is preserved.
pub fn tokenize(text: &str) -> Vec<String> {
    let canonical = text.nfkc().collect::<String>();
    PUNCT
        .replace_all(&canonical, "")
        .split_whitespace()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Text to terms: tokenize, drop stopwords, stem.
///
/// The output index of each term is its position in the document, so positions
/// are dense over the tokens that survive stopword removal.
pub struct Normalizer {
    stopwords: Stopwords,
    stemmer: Stemmer,
}

impl Normalizer {
    pub fn new(stopwords: Stopwords) -> Self {
        Self { stopwords, stemmer: Stemmer::create(Algorithm::English) }
    }

    pub fn stopwords(&self) -> &Stopwords {
        &self.stopwords
    }

    pub fn normalize(&self, text: &str) -> Vec<Term> {
        tokenize(text)
            .into_iter()
            .filter(|t| !self.stopwords.contains(t))
            .map(|t| self.stemmer.stem(&t).into_owned())
            .collect()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Stopwords::english())
    }
}

impl fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normalizer").field("stopwords", &self.stopwords).finish()
    }
}
