use criterion::{criterion_group, criterion_main, Criterion};
use search_core::tokenizer::tokenize;

const TEXT: &str = "Looking for a STUDY_GROUP for the calculus final next week. \
We meet in the Rolex Learning Center, near the café, around 18:00. \
Bring your notes on séries entières and Fourier transforms; ＰＩＺＺＡ afterwards!";

fn bench_tokenize(c: &mut Criterion) {
    let text = TEXT.repeat(64);
    c.bench_function("tokenize_request_text", |b| b.iter(|| tokenize(&text)));
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
