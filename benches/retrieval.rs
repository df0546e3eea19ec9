use course_ta::corpus::{Chunk, Corpus, Source};
use course_ta::retrieval::{extract_relevant_lines, keyword_fallback, rank};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const DIMENSION: usize = 384;
const CHUNKS: usize = 5_000;

const WORDS: [&str; 12] = [
    "pandas", "docker", "assignment", "csv", "python", "deadline", "kumu", "network", "project",
    "environment", "submission", "graded",
];

/// Deterministic pseudo-random corpus
fn synthetic_corpus() -> Corpus {
    let mut state: u32 = 0x2545_f491;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    };

    let chunks = (0..CHUNKS)
        .map(|i| {
            let embedding = (0..DIMENSION)
                .map(|_| (next() % 2000) as f32 / 1000.0 - 1.0)
                .collect();
            let text = (0..40)
                .map(|_| WORDS[next() as usize % WORDS.len()])
                .collect::<Vec<_>>()
                .join(" ");
            Chunk {
                text,
                embedding,
                url: format!("https://forum.example/t/{}", i),
                source: Source::Discourse,
            }
        })
        .collect();

    Corpus::new(chunks).expect("synthetic corpus is consistent")
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let corpus = synthetic_corpus();
    let query: Vec<f32> = (0..DIMENSION).map(|i| (i as f32).sin()).collect();
    let question = "how do I read a csv file with pandas for the assignment";
    let text = corpus.chunks()[0].text.replace(" docker ", ". docker ");

    c.bench_function("rank", |b| {
        b.iter(|| rank(black_box(&query), black_box(&corpus), 3))
    });
    c.bench_function("keyword_fallback", |b| {
        b.iter(|| keyword_fallback(black_box(question), black_box(&corpus), 2, 0.01))
    });
    c.bench_function("extract_relevant_lines", |b| {
        b.iter(|| extract_relevant_lines(black_box(&text), black_box(question), 3, 300))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
