use criterion::{criterion_group, criterion_main, Criterion};
use invidx_core::Normalizer;

const TEXT: &str = "The crawler stores each fetched page as a record with its URL, title and \
    extracted content. Indexing normalizes that content: punctuation is stripped, tokens are \
    lowercased, stopwords are removed and every surviving token is stemmed before it is folded \
    into the postings of its term.";

fn bench_normalize(c: &mut Criterion) {
    let normalizer = Normalizer::default();
    let text = TEXT.repeat(50);
    c.bench_function("normalize_page", |b| b.iter(|| normalizer.normalize(&text)));
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
