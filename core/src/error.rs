use std::path::PathBuf;
use thiserror::Error;

use crate::BatchId;

/// Error type shared by the normalizer, builder, batch store and evaluator.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    Input(String),

    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("corrupt batch {batch}: {reason}")]
    CorruptData { batch: BatchId, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Failures scoped to one document or one batch. Callers skip the unit and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Input(_) | Error::NotFound(_) | Error::CorruptData { .. })
    }
}
