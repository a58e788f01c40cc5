use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use invidx_core::{
    BatchId, BatchIndexer, BatchStore, BuildOptions, Evaluator, FlushPolicy, MetaFile, Normalizer,
    ScanMode, Stopwords,
};
use rayon::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use std::path::{Path, PathBuf};

mod source;

use source::{collect_files, load_file, SourceDoc};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build batched inverted indexes and run boolean queries against them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Each batch holds only the documents ingested since the previous batch
    Partition,
    /// Each batch is a snapshot of everything ingested so far
    Cumulative,
}

impl From<PolicyArg> for FlushPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Partition => FlushPolicy::Partition,
            PolicyArg::Cumulative => FlushPolicy::Cumulative,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Index JSON/JSONL crawl records or .txt files into batch files
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Output batch directory
        #[arg(long)]
        output: PathBuf,
        /// Documents per batch
        #[arg(long, default_value_t = 100)]
        batch_size: usize,
        #[arg(long, value_enum, default_value_t = PolicyArg::Partition)]
        policy: PolicyArg,
        /// Stopword list, one term per line (defaults to the built-in English list)
        #[arg(long)]
        stopwords: Option<PathBuf>,
    },
    /// Evaluate `a AND b ...` or `a OR b ...` against a batch directory
    Search {
        #[arg(long)]
        index: PathBuf,
        #[arg(long)]
        query: String,
        /// Stop scanning batches for a term at the first one containing it
        #[arg(long, default_value_t = false)]
        first_match: bool,
        #[arg(long)]
        stopwords: Option<PathBuf>,
    },
    /// Print the terms of one batch with their doc frequency and postings
    Terms {
        #[arg(long)]
        index: PathBuf,
        #[arg(long)]
        batch: u32,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, batch_size, policy, stopwords } => {
            let options = BuildOptions { batch_size, policy: policy.into() };
            build_index(&input, &output, options, stopwords.as_deref())
        }
        Commands::Search { index, query, first_match, stopwords } => {
            let mode = if first_match { ScanMode::FirstMatch } else { ScanMode::AllBatches };
            search(&index, &query, mode, stopwords.as_deref())
        }
        Commands::Terms { index, batch } => print_terms(&index, BatchId(batch)),
    }
}

fn load_stopwords(path: Option<&Path>) -> Result<Stopwords> {
    match path {
        Some(p) => Ok(Stopwords::from_file(p)?),
        None => Ok(Stopwords::english()),
    }
}

fn build_index(
    input: &Path,
    output: &Path,
    options: BuildOptions,
    stopwords: Option<&Path>,
) -> Result<()> {
    let normalizer = Normalizer::new(load_stopwords(stopwords)?);
    let store = BatchStore::new(output);
    let mut indexer = BatchIndexer::new(normalizer, store.clone(), options)?;

    let files = collect_files(input);
    tracing::info!(files = files.len(), input = %input.display(), "collected input files");

    let mut group: Vec<SourceDoc> = Vec::with_capacity(options.batch_size);
    let mut skipped = 0usize;
    for file in files {
        let docs = match load_file(&file) {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %format!("{e:#}"), "skipping unreadable file");
                skipped += 1;
                continue;
            }
        };
        for doc in docs {
            match doc {
                Ok(doc) => {
                    group.push(doc);
                    if group.len() == options.batch_size {
                        ingest_group(&mut indexer, &mut group)?;
                    }
                }
                Err(e) => {
                    tracing::warn!(file = %file.display(), error = %format!("{e:#}"), "skipping document");
                    skipped += 1;
                }
            }
        }
    }
    ingest_group(&mut indexer, &mut group)?;
    let summary = indexer.finish()?;

    let meta = MetaFile {
        version: 1,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        policy: options.policy,
        batch_size: options.batch_size,
        num_batches: summary.batches.len() as u32,
        num_docs: summary.num_docs,
    };
    store.save_meta(&meta)?;

    tracing::info!(
        num_docs = summary.num_docs,
        batches = summary.batches.len(),
        skipped,
        output = %output.display(),
        "index build complete"
    );
    Ok(())
}

/// Normalize a group in parallel, then fold it into the builder in input order.
fn ingest_group(indexer: &mut BatchIndexer, group: &mut Vec<SourceDoc>) -> Result<()> {
    let normalized: Vec<(String, Vec<String>)> = {
        let normalizer = indexer.normalizer();
        group
            .par_iter()
            .map(|doc| (doc.id.clone(), normalizer.normalize(&doc.text)))
            .collect()
    };
    group.clear();
    for (id, terms) in normalized {
        indexer.add_normalized(&id, &terms)?;
    }
    Ok(())
}

fn search(index: &Path, query: &str, mode: ScanMode, stopwords: Option<&Path>) -> Result<()> {
    let normalizer = Normalizer::new(load_stopwords(stopwords)?);
    let store = BatchStore::new(index);
    let results = Evaluator::new(&store, &normalizer).with_mode(mode).search(query)?;

    let mut ids: Vec<String> = results.into_iter().collect();
    ids.sort();
    if ids.is_empty() {
        println!("No documents match the query '{query}'.");
    } else {
        println!("Documents matching the query '{query}' ({} documents):", ids.len());
        for id in ids {
            println!("{id}");
        }
    }
    Ok(())
}

fn print_terms(index: &Path, batch: BatchId) -> Result<()> {
    let store = BatchStore::new(index);
    let idx = store.read(batch).with_context(|| format!("reading batch {batch}"))?;
    let mut terms: Vec<_> = idx.iter().collect();
    terms.sort_by_key(|(t, _)| *t);

    println!("{:<15} {:<10} Posting List", "Term", "Doc. Freq.");
    for (term, entry) in terms {
        let postings: Vec<String> = entry
            .postings()
            .map(|p| format!("{}:{:?}", p.doc_id, p.positions))
            .collect();
        println!("{:<15} {:<10} {}", term, entry.doc_freq(), postings.join(" "));
    }
    Ok(())
}
