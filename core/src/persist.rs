use crate::{Batch, BatchId, Error, FlushPolicy, Index, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

const BATCH_PREFIX: &str = "inverted_index_batch_";
const BATCH_SUFFIX: &str = ".json";

/// Summary of the build session that last wrote the store. `num_batches` and
/// `num_docs` count that session only; earlier batches may precede it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub created_at: String,
    pub policy: FlushPolicy,
    pub batch_size: usize,
    pub num_batches: u32,
    pub num_docs: u64,
}

/// Directory of immutable batch files named `inverted_index_batch_<n>.json`.
#[derive(Debug, Clone)]
pub struct BatchStore {
    root: PathBuf,
}

impl BatchStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn batch_path(&self, id: BatchId) -> PathBuf {
        self.root.join(format!("{BATCH_PREFIX}{}{BATCH_SUFFIX}", id.0))
    }

    fn meta(&self) -> PathBuf {
        self.root.join("meta.json")
    }

    pub fn write(&self, batch: &Batch) -> Result<()> {
        self.write_index(batch.id, &batch.index)
    }

    /// Write `index` as batch `id`, a full replace. The file only appears under its
    /// final name once completely written.
    pub fn write_index(&self, id: BatchId, index: &Index) -> Result<()> {
        create_dir_all(&self.root)?;
        let path = self.batch_path(id);
        let tmp = path.with_extension("json.tmp");
        {
            let mut w = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut w, index).map_err(|e| Error::Io(e.into()))?;
            w.flush()?;
        }
        fs::rename(&tmp, &path)?;
        tracing::info!(batch = %id, terms = index.len(), path = %path.display(), "wrote batch");
        Ok(())
    }

    pub fn read(&self, id: BatchId) -> Result<Index> {
        let path = self.batch_path(id);
        let f = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::NotFound(path)),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_reader(BufReader::new(f))
            .map_err(|e| Error::CorruptData { batch: id, reason: e.to_string() })
    }

    /// Batch ids in creation order. A missing store directory holds no batches.
    pub fn list_batches(&self) -> Result<Vec<BatchId>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(parse_batch_name) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub fn next_batch_id(&self) -> Result<BatchId> {
        Ok(self
            .list_batches()?
            .last()
            .map_or(BatchId(0), |id| id.next()))
    }

    pub fn save_meta(&self, meta: &MetaFile) -> Result<()> {
        create_dir_all(&self.root)?;
        let json = serde_json::to_string_pretty(meta).map_err(|e| Error::Io(e.into()))?;
        fs::write(self.meta(), json)?;
        Ok(())
    }

    pub fn load_meta(&self) -> Result<MetaFile> {
        let path = self.meta();
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::NotFound(path)),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map_err(|e| Error::Input(format!("{}: {e}", path.display())))
    }
}

/// Only the canonical spelling `batch_path` produces: no sign, no leading zeros.
fn parse_batch_name(name: &str) -> Option<BatchId> {
    let digits = name.strip_prefix(BATCH_PREFIX)?.strip_suffix(BATCH_SUFFIX)?;
    let n: u32 = digits.parse().ok()?;
    (n.to_string() == digits).then_some(BatchId(n))
}
