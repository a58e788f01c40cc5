use invidx_core::tokenizer::{tokenize, Normalizer, Stopwords};

#[test]
fn it_normalizes_and_stems() {
    let words = Normalizer::default().normalize("Running RUN! Computers, computer.");
    assert_eq!(words, vec!["run", "run", "comput", "comput"]);
}

#[test]
fn it_filters_stopwords() {
    let words = Normalizer::default().normalize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert_eq!(words.len(), 5);
}

#[test]
fn punctuation_and_case_do_not_matter() {
    let n = Normalizer::default();
    assert_eq!(n.normalize("Hello, World!"), n.normalize("hello world"));
}

#[test]
fn positions_are_dense_after_stopword_removal() {
    let words = Normalizer::default().normalize("the cat of the dog");
    assert_eq!(words, vec!["cat", "dog"]);
}

#[test]
fn custom_stopwords_replace_defaults() {
    let n = Normalizer::new(Stopwords::parse("cat\n"));
    assert_eq!(n.normalize("the cat"), vec!["the"]);
    let none = Normalizer::new(Stopwords::empty());
    assert_eq!(none.normalize("the cat"), vec!["the", "cat"]);
}

#[test]
fn missing_stopword_file_is_a_configuration_error() {
    let err = Stopwords::from_file("/definitely/not/here/stopwords_en.txt").unwrap_err();
    assert!(matches!(err, invidx_core::Error::Configuration(_)));
}

#[test]
fn tokenize_keeps_order_and_drops_symbols() {
    assert_eq!(tokenize("  Rust's   [fast] -- \"safe\" "), vec!["rusts", "fast", "safe"]);
}
