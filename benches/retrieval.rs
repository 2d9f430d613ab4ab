use criterion::{Criterion, criterion_group, criterion_main};
use nutriveda_rag::ingest::{Row, row_to_document};
use nutriveda_rag::retrieval::rank;
use nutriveda_rag::store::{Document, Metadata};
use std::hint::black_box;

const DIMENSIONS: usize = 1536;
const DOCUMENTS: usize = 5000;

/// Deterministic pseudo-random vector, so runs are comparable
fn vector(seed: usize) -> Vec<f32> {
    let mut state = seed as u64 ^ 0x9E37_79B9_7F4A_7C15;
    (0..DIMENSIONS)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 2000) as f32 / 1000.0 - 1.0
        })
        .collect()
}

fn documents() -> Vec<Document> {
    (0..DOCUMENTS)
        .map(|i| Document {
            id: format!("food-{}", i),
            text: format!("Food: Food {}", i),
            metadata: Metadata::new(),
            embedding: vector(i + 1),
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let documents = documents();
    let query = vector(DOCUMENTS + 1);
    c.bench_function("rank_top5", |b| {
        b.iter(|| rank(black_box(&query), black_box(&documents), 5))
    });

    let row = Row::from([
        ("food".to_string(), "Paneer Tikka (Tandoori)".to_string()),
        ("Caloric Value".to_string(), "265".to_string()),
        ("Protein".to_string(), "18".to_string()),
    ]);
    c.bench_function("row_to_document", |b| {
        b.iter(|| row_to_document(black_box(&row)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
