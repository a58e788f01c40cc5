//! Groups ingested documents into fixed-size batches and persists each one.

use std::collections::HashSet;

use crate::{
    document_id_for_url, BatchId, BatchStore, DocumentId, Error, FlushPolicy, IndexBuilder, Normalizer,
    Result, Term,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub batch_size: usize,
    pub policy: FlushPolicy,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { batch_size: 100, policy: FlushPolicy::Partition }
    }
}

/// Counts for one build session. `num_docs` is the number of distinct document ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub batches: Vec<BatchId>,
    pub num_docs: u64,
}

/// Drives an [`IndexBuilder`], flushing to the store after every `batch_size` documents.
pub struct BatchIndexer {
    normalizer: Normalizer,
    builder: IndexBuilder,
    store: BatchStore,
    batch_size: usize,
    next_batch: BatchId,
    pending: usize,
    seen: HashSet<DocumentId>,
    summary: BuildSummary,
}

impl BatchIndexer {
    /// New batches are appended after any the store already holds.
    pub fn new(normalizer: Normalizer, store: BatchStore, options: BuildOptions) -> Result<Self> {
        if options.batch_size == 0 {
            return Err(Error::Configuration("batch size must be positive".into()));
        }
        let next_batch = store.next_batch_id()?;
        Ok(Self {
            normalizer,
            builder: IndexBuilder::new(options.policy),
            store,
            batch_size: options.batch_size,
            next_batch,
            pending: 0,
            seen: HashSet::new(),
            summary: BuildSummary::default(),
        })
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn builder(&self) -> &IndexBuilder {
        &self.builder
    }

    /// Normalize and ingest. Returns the batch written if this document completed a group.
    pub fn add_document(&mut self, doc_id: &str, text: &str) -> Result<Option<BatchId>> {
        let terms = self.normalizer.normalize(text);
        self.add_normalized(doc_id, &terms)
    }

    pub fn add_url_document(&mut self, url: &str, text: &str) -> Result<Option<BatchId>> {
        let doc_id = document_id_for_url(url);
        self.add_document(&doc_id, text)
    }

    pub fn add_normalized(&mut self, doc_id: &str, terms: &[Term]) -> Result<Option<BatchId>> {
        self.builder.ingest(doc_id, terms);
        self.pending += 1;
        if !self.seen.contains(doc_id) {
            self.seen.insert(doc_id.to_string());
            self.summary.num_docs += 1;
        }
        if self.pending < self.batch_size {
            return Ok(None);
        }
        self.flush().map(Some)
    }

    /// Persist the live index, then apply the flush policy. A failed write leaves the
    /// live index and the pending group untouched so the flush can be retried.
    fn flush(&mut self) -> Result<BatchId> {
        let id = self.next_batch;
        self.store.write_index(id, self.builder.index())?;
        self.builder.commit();
        tracing::info!(batch = %id, docs = self.pending, "flushed batch");
        self.summary.batches.push(id);
        self.next_batch = id.next();
        self.pending = 0;
        Ok(id)
    }

    /// Flush the trailing partial group, if any.
    pub fn finish(mut self) -> Result<BuildSummary> {
        if self.pending > 0 {
            self.flush()?;
        }
        Ok(self.summary)
    }
}
