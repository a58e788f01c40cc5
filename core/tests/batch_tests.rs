use invidx_core::{
    BatchId, BatchIndexer, BatchStore, BuildOptions, Error, FlushPolicy, IndexBuilder, MetaFile, Normalizer,
};
use std::fs;
use tempfile::tempdir;

fn terms(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[test]
fn batch_round_trip() {
    let dir = tempdir().unwrap();
    let store = BatchStore::new(dir.path());
    let mut builder = IndexBuilder::default();
    builder.ingest("docA", &terms(&["comput", "hello", "comput"]));
    builder.ingest("docB", &terms(&["hello"]));
    let batch = builder.flush(BatchId(0));

    store.write(&batch).unwrap();
    let back = store.read(BatchId(0)).unwrap();
    assert_eq!(back, batch.index);
    assert_eq!(back.get("comput").unwrap().positions("docA"), Some(&[0, 2][..]));
    assert_eq!(back.get("hello").unwrap().doc_freq(), 2);
}

#[test]
fn list_batches_is_numeric_and_ignores_other_files() {
    let dir = tempdir().unwrap();
    let store = BatchStore::new(dir.path());
    for n in [10, 2, 1] {
        store.write(&IndexBuilder::default().flush(BatchId(n))).unwrap();
    }
    fs::write(dir.path().join("inverted_index_batch_3.json.tmp"), "{").unwrap();
    fs::write(dir.path().join("notes.txt"), "x").unwrap();
    assert_eq!(store.list_batches().unwrap(), vec![BatchId(1), BatchId(2), BatchId(10)]);
    assert_eq!(store.next_batch_id().unwrap(), BatchId(11));
}

#[test]
fn missing_store_has_no_batches() {
    let dir = tempdir().unwrap();
    let store = BatchStore::new(dir.path().join("absent"));
    assert!(store.list_batches().unwrap().is_empty());
    assert!(matches!(store.read(BatchId(0)), Err(Error::NotFound(_))));
}

#[test]
fn unparseable_batch_is_corrupt() {
    let dir = tempdir().unwrap();
    let store = BatchStore::new(dir.path());
    fs::write(store.batch_path(BatchId(0)), "{ not json").unwrap();
    assert!(matches!(store.read(BatchId(0)), Err(Error::CorruptData { batch: BatchId(0), .. })));
}

#[test]
fn indexer_flushes_every_group() {
    let dir = tempdir().unwrap();
    let store = BatchStore::new(dir.path());
    let options = BuildOptions { batch_size: 2, policy: FlushPolicy::Partition };
    let mut indexer = BatchIndexer::new(Normalizer::default(), store.clone(), options).unwrap();

    assert_eq!(indexer.add_document("d1", "hello computer").unwrap(), None);
    assert_eq!(indexer.add_document("d2", "hello").unwrap(), Some(BatchId(0)));
    assert_eq!(indexer.add_document("d3", "computers").unwrap(), None);
    let summary = indexer.finish().unwrap();

    assert_eq!(summary.batches, vec![BatchId(0), BatchId(1)]);
    assert_eq!(summary.num_docs, 3);
    let first = store.read(BatchId(0)).unwrap();
    let second = store.read(BatchId(1)).unwrap();
    assert_eq!(first.get("hello").unwrap().doc_freq(), 2);
    assert!(second.get("hello").is_none());
    assert_eq!(second.get("comput").unwrap().documents().collect::<Vec<_>>(), vec!["d3"]);
}

#[test]
fn cumulative_batches_are_supersets() {
    let dir = tempdir().unwrap();
    let store = BatchStore::new(dir.path());
    let options = BuildOptions { batch_size: 1, policy: FlushPolicy::Cumulative };
    let mut indexer = BatchIndexer::new(Normalizer::default(), store.clone(), options).unwrap();
    indexer.add_document("d1", "hello").unwrap();
    indexer.add_document("d2", "hello").unwrap();
    indexer.finish().unwrap();
    assert_eq!(store.read(BatchId(0)).unwrap().get("hello").unwrap().doc_freq(), 1);
    assert_eq!(store.read(BatchId(1)).unwrap().get("hello").unwrap().doc_freq(), 2);
}

#[test]
fn indexer_appends_after_existing_batches() {
    let dir = tempdir().unwrap();
    let store = BatchStore::new(dir.path());
    store.write(&IndexBuilder::default().flush(BatchId(4))).unwrap();
    let mut indexer = BatchIndexer::new(Normalizer::default(), store, BuildOptions::default()).unwrap();
    indexer.add_url_document("https://example.com/a", "hello").unwrap();
    assert_eq!(indexer.finish().unwrap().batches, vec![BatchId(5)]);
}

#[test]
fn zero_batch_size_is_rejected() {
    let dir = tempdir().unwrap();
    let options = BuildOptions { batch_size: 0, ..BuildOptions::default() };
    let res = BatchIndexer::new(Normalizer::default(), BatchStore::new(dir.path()), options);
    assert!(matches!(res, Err(Error::Configuration(_))));
}

#[test]
fn failed_flush_keeps_the_group_for_retry() {
    let dir = tempdir().unwrap();
    let store = BatchStore::new(dir.path());
    let blocker = dir.path().join("inverted_index_batch_0.json.tmp");
    fs::create_dir(&blocker).unwrap();

    let options = BuildOptions { batch_size: 2, policy: FlushPolicy::Partition };
    let mut indexer = BatchIndexer::new(Normalizer::default(), store.clone(), options).unwrap();
    assert_eq!(indexer.add_document("d1", "hello").unwrap(), None);
    assert!(matches!(indexer.add_document("d2", "world"), Err(Error::Io(_))));
    assert_eq!(indexer.builder().num_docs(), 2);
    assert!(store.list_batches().unwrap().is_empty());

    fs::remove_dir(&blocker).unwrap();
    let summary = indexer.finish().unwrap();
    assert_eq!(summary.batches, vec![BatchId(0)]);
    let batch = store.read(BatchId(0)).unwrap();
    assert_eq!(batch.get("hello").unwrap().documents().collect::<Vec<_>>(), vec!["d1"]);
    assert_eq!(batch.get("world").unwrap().documents().collect::<Vec<_>>(), vec!["d2"]);
}

#[test]
fn failed_flush_is_retried_by_the_next_document() {
    let dir = tempdir().unwrap();
    let store = BatchStore::new(dir.path());
    let blocker = dir.path().join("inverted_index_batch_0.json.tmp");
    fs::create_dir(&blocker).unwrap();

    let options = BuildOptions { batch_size: 1, policy: FlushPolicy::Partition };
    let mut indexer = BatchIndexer::new(Normalizer::default(), store.clone(), options).unwrap();
    assert!(indexer.add_document("d1", "hello").is_err());
    fs::remove_dir(&blocker).unwrap();
    assert_eq!(indexer.add_document("d2", "world").unwrap(), Some(BatchId(0)));
    let batch = store.read(BatchId(0)).unwrap();
    assert!(batch.get("hello").is_some());
    assert!(batch.get("world").is_some());
}

#[test]
fn directories_and_padded_names_are_not_batches() {
    let dir = tempdir().unwrap();
    let store = BatchStore::new(dir.path());
    fs::create_dir(dir.path().join("inverted_index_batch_0.json")).unwrap();
    fs::write(dir.path().join("inverted_index_batch_05.json"), "{}").unwrap();
    fs::write(dir.path().join("inverted_index_batch_+6.json"), "{}").unwrap();
    assert!(store.list_batches().unwrap().is_empty());
    assert_eq!(store.next_batch_id().unwrap(), BatchId(0));

    store.write(&IndexBuilder::default().flush(BatchId(5))).unwrap();
    assert_eq!(store.list_batches().unwrap(), vec![BatchId(5)]);
}

#[test]
fn meta_round_trip() {
    let dir = tempdir().unwrap();
    let store = BatchStore::new(dir.path().join("index"));
    assert!(matches!(store.load_meta(), Err(Error::NotFound(_))));

    let meta = MetaFile {
        version: 1,
        created_at: "2024-01-01T00:00:00Z".into(),
        policy: FlushPolicy::Cumulative,
        batch_size: 50,
        num_batches: 3,
        num_docs: 120,
    };
    store.save_meta(&meta).unwrap();
    assert_eq!(store.load_meta().unwrap(), meta);
    assert!(store.list_batches().unwrap().is_empty());
}

#[test]
fn summary_counts_distinct_documents() {
    let dir = tempdir().unwrap();
    let store = BatchStore::new(dir.path());
    let options = BuildOptions { batch_size: 2, policy: FlushPolicy::Partition };
    let mut indexer = BatchIndexer::new(Normalizer::default(), store, options).unwrap();
    indexer.add_document("d1", "hello").unwrap();
    indexer.add_document("d1", "hello").unwrap();
    indexer.add_document("d2", "world").unwrap();
    let summary = indexer.finish().unwrap();
    assert_eq!(summary.num_docs, 2);
    assert_eq!(summary.batches, vec![BatchId(0), BatchId(1)]);
}
