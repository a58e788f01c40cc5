use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::{BatchId, BatchStore, DocumentId, Error, Index, Normalizer, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    And,
    Or,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::And => f.write_str("AND"),
            Operator::Or => f.write_str("OR"),
        }
    }
}

/// Terms joined by a single operator. Terms are kept raw and normalized at lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanQuery {
    pub operator: Operator,
    pub terms: Vec<String>,
}

impl BooleanQuery {
    /// Split on the literal ` AND ` or ` OR ` token. A query without either is a
    /// single term under AND.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::Input("empty query".into()));
        }
        let operator = match (raw.contains(" AND "), raw.contains(" OR ")) {
            (true, true) => {
                return Err(Error::Input(format!("query mixes AND and OR: {raw}")));
            }
            (false, true) => Operator::Or,
            _ => Operator::And,
        };
        let sep = format!(" {operator} ");
        let terms = raw.split(sep.as_str()).map(|t| t.trim().to_string()).collect();
        Ok(Self { operator, terms })
    }
}

impl FromStr for BooleanQuery {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// How many batches a term lookup scans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Union postings from every batch.
    #[default]
    AllBatches,
    /// Stop at the earliest batch containing the term. Only complete when batches
    /// are disjoint partitions and a term lives in one of them.
    FirstMatch,
}

/// Batches of one query, each read at most once. Unreadable batches resolve to `None`.
struct LoadedBatches<'a> {
    store: &'a BatchStore,
    ids: &'a [BatchId],
    slots: Vec<OnceLock<Option<Index>>>,
}

impl<'a> LoadedBatches<'a> {
    fn new(store: &'a BatchStore, ids: &'a [BatchId]) -> Self {
        Self { store, ids, slots: ids.iter().map(|_| OnceLock::new()).collect() }
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn get(&self, i: usize) -> Option<&Index> {
        self.slots[i]
            .get_or_init(|| match self.store.read(self.ids[i]) {
                Ok(index) => Some(index),
                Err(e) => {
                    tracing::warn!(batch = %self.ids[i], error = %e, "skipping batch");
                    None
                }
            })
            .as_ref()
    }

    fn preload(&self) {
        (0..self.len()).into_par_iter().for_each(|i| {
            self.get(i);
        });
    }
}

/// Evaluates boolean queries against batches of a [`BatchStore`].
pub struct Evaluator<'a> {
    store: &'a BatchStore,
    normalizer: &'a Normalizer,
    mode: ScanMode,
}

impl<'a> Evaluator<'a> {
    pub fn new(store: &'a BatchStore, normalizer: &'a Normalizer) -> Self {
        Self { store, normalizer, mode: ScanMode::default() }
    }

    pub fn with_mode(mut self, mode: ScanMode) -> Self {
        self.mode = mode;
        self
    }

    /// Parse `raw` and evaluate it over every batch in the store.
    pub fn search(&self, raw: &str) -> Result<HashSet<DocumentId>> {
        let query = BooleanQuery::parse(raw)?;
        let batch_ids = self.store.list_batches()?;
        Ok(self.evaluate(&query, &batch_ids))
    }

    /// Matching document ids, unordered. Missing or corrupt batches are skipped.
    pub fn evaluate(&self, query: &BooleanQuery, batch_ids: &[BatchId]) -> HashSet<DocumentId> {
        if batch_ids.is_empty() {
            return HashSet::new();
        }
        let batches = LoadedBatches::new(self.store, batch_ids);
        if self.mode == ScanMode::AllBatches {
            batches.preload();
        }

        let mut result: Option<HashSet<DocumentId>> = None;
        for term in &query.terms {
            let docs = match self.term_docs(&batches, term) {
                Some(docs) => docs,
                None if query.operator == Operator::And => {
                    tracing::debug!(term = %term, "term not found, AND query is empty");
                    return HashSet::new();
                }
                None => continue,
            };
            let acc = match result.take() {
                None => docs,
                Some(mut acc) => {
                    match query.operator {
                        Operator::And => acc.retain(|d| docs.contains(d)),
                        Operator::Or => acc.extend(docs),
                    }
                    acc
                }
            };
            if query.operator == Operator::And && acc.is_empty() {
                return acc;
            }
            result = Some(acc);
        }
        result.unwrap_or_default()
    }

    /// Documents matching one query term, `None` when it is absent from every batch.
    /// A term that normalizes to several stems needs all of them.
    fn term_docs(&self, batches: &LoadedBatches<'_>, term: &str) -> Option<HashSet<DocumentId>> {
        let stems = self.normalizer.normalize(term);
        let mut acc: Option<HashSet<DocumentId>> = None;
        for stem in &stems {
            let docs = self.stem_docs(batches, stem)?;
            acc = Some(match acc {
                None => docs,
                Some(mut a) => {
                    a.retain(|d| docs.contains(d));
                    a
                }
            });
        }
        acc
    }

    fn stem_docs(&self, batches: &LoadedBatches<'_>, stem: &str) -> Option<HashSet<DocumentId>> {
        let mut docs = HashSet::new();
        let mut found = false;
        for i in 0..batches.len() {
            let Some(entry) = batches.get(i).and_then(|index| index.get(stem)) else {
                continue;
            };
            if entry.doc_freq() == 0 {
                continue;
            }
            found = true;
            docs.extend(entry.documents().map(str::to_string));
            if self.mode == ScanMode::FirstMatch {
                break;
            }
        }
        tracing::debug!(stem, found, docs = docs.len(), "resolved stem");
        found.then_some(docs)
    }
}
