//! Inverted index construction and boolean retrieval over persisted batches.

pub mod batch;
pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod tokenizer;

pub type Term = String;
pub type DocumentId = String;

pub use batch::{BatchIndexer, BuildOptions, BuildSummary};
pub use error::{Error, Result};
pub use index::{
    document_id_for_url, Batch, BatchId, FlushPolicy, Index, IndexBuilder, Posting, TermEntry,
};
pub use persist::{BatchStore, MetaFile};
pub use query::{BooleanQuery, Evaluator, Operator, ScanMode};
pub use tokenizer::{Normalizer, Stopwords};
