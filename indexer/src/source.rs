//! Reading crawled records and plain text files into `(doc_id, text)` pairs.

use anyhow::{anyhow, Context, Result};
use invidx_core::document_id_for_url;
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: Option<String>,
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(alias = "body")]
    content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDoc {
    pub id: String,
    pub text: String,
}

impl TryFrom<InputDoc> for SourceDoc {
    type Error = anyhow::Error;

    fn try_from(doc: InputDoc) -> Result<Self> {
        let id = match (doc.id, doc.url.as_deref()) {
            (Some(id), _) => id,
            (None, Some(url)) => document_id_for_url(url),
            (None, None) => {
                return Err(anyhow!("record {:?} has neither id nor url", doc.title.unwrap_or_default()));
            }
        };
        Ok(Self { id, text: doc.content })
    }
}

/// Indexable files under `input`, sorted by path.
pub fn collect_files(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }
    WalkDir::new(input)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file())
        .filter(|p| matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl" | "txt")))
        .collect()
}

/// Documents of one file. A failing record is returned as an `Err` item so the
/// caller can skip it without losing the rest of the file.
pub fn load_file(file: &Path) -> Result<Vec<Result<SourceDoc>>> {
    match file.extension().and_then(|s| s.to_str()) {
        Some("jsonl") => load_jsonl(file),
        Some("json") => load_json(file),
        Some("txt") => {
            let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
            let id = file
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| anyhow!("unusable file name {}", file.display()))?
                .to_string();
            Ok(vec![Ok(SourceDoc { id, text })])
        }
        _ => Err(anyhow!("unsupported file type: {}", file.display())),
    }
}

fn load_jsonl(file: &Path) -> Result<Vec<Result<SourceDoc>>> {
    let reader = BufReader::new(File::open(file)?);
    let mut docs = Vec::new();
    // Split on raw bytes so a line with invalid UTF-8 only fails its own record.
    for (n, line) in reader.split(b'\n').enumerate() {
        let line = line.with_context(|| format!("{} line {}", file.display(), n + 1))?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        docs.push(
            serde_json::from_slice::<InputDoc>(&line)
                .with_context(|| format!("{} line {}", file.display(), n + 1))
                .and_then(SourceDoc::try_from),
        );
    }
    Ok(docs)
}

fn load_json(file: &Path) -> Result<Vec<Result<SourceDoc>>> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value =
        serde_json::from_reader(reader).with_context(|| format!("parsing {}", file.display()))?;
    let values = match json {
        serde_json::Value::Array(arr) => arr,
        obj @ serde_json::Value::Object(_) => vec![obj],
        _ => return Err(anyhow!("{} holds neither a record nor an array", file.display())),
    };
    Ok(values
        .into_iter()
        .map(|v| {
            serde_json::from_value::<InputDoc>(v)
                .with_context(|| format!("record in {}", file.display()))
                .and_then(SourceDoc::try_from)
        })
        .collect())
}
