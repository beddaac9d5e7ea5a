use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use termassoc_core::{AssociationConfig, AssociationEngine, InvertedIndex};

fn synthetic_index(num_docs: u32, vocab: u32) -> InvertedIndex {
    let mut idx = InvertedIndex::new();
    for d in 0..num_docs {
        let tokens: Vec<String> = (0..12).map(|i| format!("t{}", (d * 7 + i * 13) % vocab)).collect();
        idx.add_document(tokens).expect("writable index");
    }
    idx.freeze();
    idx
}

fn bench_build(c: &mut Criterion) {
    let idx = synthetic_index(2_000, 400);
    c.bench_function("build_pmi_400_terms", |b| {
        b.iter_batched(
            || AssociationEngine::new(&idx, AssociationConfig::default()).expect("frozen index"),
            |mut engine| engine.build().expect("first build"),
            BatchSize::SmallInput,
        )
    });
    c.bench_function("concurrence_all_pairs", |b| {
        let terms = idx.get_terms();
        b.iter(|| {
            let mut total = 0u64;
            for (i, t1) in terms.iter().enumerate() {
                for t2 in &terms[i + 1..] {
                    total += u64::from(idx.concurrence(t1, t2));
                }
            }
            total
        })
    });
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
