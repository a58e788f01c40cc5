use md5::{Digest, Md5};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::{DocumentId, Term};

/// Sequence number of a persisted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchId(pub u32);

impl BatchId {
    pub fn next(self) -> Self {
        BatchId(self.0 + 1)
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Occurrences of one term within one document, as stored in a batch file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocumentId,
    pub positions: Vec<u32>,
}

#[derive(Serialize)]
struct PostingRef<'a> {
    doc_id: &'a str,
    positions: &'a [u32],
}

struct PostingsSeq<'a>(&'a BTreeMap<DocumentId, Vec<u32>>);

impl Serialize for PostingsSeq<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            self.0
                .iter()
                .map(|(doc_id, positions)| PostingRef { doc_id, positions }),
        )
    }
}

#[derive(Deserialize)]
struct TermEntryRecord {
    doc_freq: u32,
    postings: Vec<Posting>,
}

/// Postings of a single term, keyed by document id. `doc_freq` always equals the
/// number of postings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "TermEntryRecord")]
pub struct TermEntry {
    doc_freq: u32,
    postings: BTreeMap<DocumentId, Vec<u32>>,
}

impl TermEntry {
    pub fn doc_freq(&self) -> u32 {
        self.doc_freq
    }

    pub fn positions(&self, doc_id: &str) -> Option<&[u32]> {
        self.postings.get(doc_id).map(Vec::as_slice)
    }

    pub fn documents(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }

    pub fn postings(&self) -> impl Iterator<Item = Posting> + '_ {
        self.postings.iter().map(|(doc_id, positions)| Posting {
            doc_id: doc_id.clone(),
            positions: positions.clone(),
        })
    }

    fn record(&mut self, doc_id: &str, position: u32) {
        match self.postings.get_mut(doc_id) {
            Some(positions) => positions.push(position),
            None => {
                self.postings.insert(doc_id.to_string(), vec![position]);
                self.doc_freq += 1;
            }
        }
    }

    fn remove(&mut self, doc_id: &str) {
        if self.postings.remove(doc_id).is_some() {
            self.doc_freq -= 1;
        }
    }
}

impl TryFrom<TermEntryRecord> for TermEntry {
    type Error = String;

    fn try_from(record: TermEntryRecord) -> Result<Self, Self::Error> {
        let mut postings = BTreeMap::new();
        for Posting { doc_id, positions } in record.postings {
            if postings.contains_key(&doc_id) {
                return Err(format!("duplicate posting for document {doc_id}"));
            }
            postings.insert(doc_id, positions);
        }
        if record.doc_freq as usize != postings.len() {
            return Err(format!(
                "doc_freq {} does not match {} postings",
                record.doc_freq,
                postings.len()
            ));
        }
        Ok(Self { doc_freq: record.doc_freq, postings })
    }
}

impl Serialize for TermEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TermEntry", 2)?;
        state.serialize_field("doc_freq", &self.doc_freq)?;
        state.serialize_field("postings", &PostingsSeq(&self.postings))?;
        state.end()
    }
}

/// Term to postings mapping. Serializes as the batch file's top-level object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Index {
    terms: HashMap<Term, TermEntry>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, term: &str) -> Option<&TermEntry> {
        self.terms.get(term)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TermEntry)> {
        self.terms.iter().map(|(t, e)| (t.as_str(), e))
    }

    /// Fold one occurrence of `term` at `position` in `doc_id`.
    fn record(&mut self, term: &str, doc_id: &str, position: u32) {
        match self.terms.get_mut(term) {
            Some(entry) => entry.record(doc_id, position),
            None => {
                let mut entry = TermEntry::default();
                entry.record(doc_id, position);
                self.terms.insert(term.to_string(), entry);
            }
        }
    }

    fn remove_document<'a, I>(&mut self, doc_id: &str, terms: I)
    where
        I: IntoIterator<Item = &'a Term>,
    {
        for term in terms {
            let now_empty = match self.terms.get_mut(term) {
                Some(entry) => {
                    entry.remove(doc_id);
                    entry.doc_freq == 0
                }
                None => false,
            };
            if now_empty {
                self.terms.remove(term);
            }
        }
    }
}

/// What happens to the live index after a flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// Reset after every flush: each batch holds only the documents ingested since the previous one.
    #[default]
    Partition,
    /// Keep accumulating: each batch is a fuller snapshot than the last.
    Cumulative,
}

impl fmt::Display for FlushPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushPolicy::Partition => f.write_str("partition"),
            FlushPolicy::Cumulative => f.write_str("cumulative"),
        }
    }
}

/// Index snapshot tagged with the batch it was flushed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub id: BatchId,
    pub index: Index,
}

/// Owns the live index during a build session.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    policy: FlushPolicy,
    index: Index,
    // Terms each live document contributed, so re-ingestion can retract them.
    doc_terms: HashMap<DocumentId, BTreeSet<Term>>,
}

impl IndexBuilder {
    pub fn new(policy: FlushPolicy) -> Self {
        Self { policy, ..Self::default() }
    }

    pub fn policy(&self) -> FlushPolicy {
        self.policy
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Number of distinct documents in the live index.
    pub fn num_docs(&self) -> usize {
        self.doc_terms.len()
    }

    /// Fold a document's normalized term stream into the live index. Re-ingesting a
    /// known id replaces that document's previous postings.
    pub fn ingest(&mut self, doc_id: &str, terms: &[Term]) {
        if let Some(previous) = self.doc_terms.remove(doc_id) {
            tracing::debug!(doc_id, "replacing postings of re-ingested document");
            self.index.remove_document(doc_id, &previous);
        }
        for (position, term) in terms.iter().enumerate() {
            self.index.record(term, doc_id, position as u32);
        }
        self.doc_terms
            .insert(doc_id.to_string(), terms.iter().cloned().collect());
    }

    /// Apply the flush policy after the live index has been persisted elsewhere.
    /// Under [`FlushPolicy::Partition`] the live index starts over empty.
    pub fn commit(&mut self) {
        if self.policy == FlushPolicy::Partition {
            self.doc_terms.clear();
            self.index = Index::new();
        }
    }

    /// Snapshot the live index as batch `id`. Under [`FlushPolicy::Partition`] the
    /// live index starts over empty.
    pub fn flush(&mut self, id: BatchId) -> Batch {
        let index = match self.policy {
            FlushPolicy::Partition => {
                self.doc_terms.clear();
                std::mem::take(&mut self.index)
            }
            FlushPolicy::Cumulative => self.index.clone(),
        };
        tracing::debug!(batch = %id, terms = index.len(), policy = %self.policy, "flushed live index");
        Batch { id, index }
    }
}

/// Document id for a URL: hex MD5 of the trimmed URL string.
pub fn document_id_for_url(url: &str) -> DocumentId {
    let mut hasher = Md5::new();
    hasher.update(url.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}
