use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use pharmacanon::{
    normalize, CanonStore, CanonicalizationEngine, Canonicalizer, Domain, InMemoryStore,
    NewRecord, SynonymMap,
};

const RAW_TARGETS: &[&str] = &[
    "LTCC",
    "  L-VSCC ",
    "Кальциевый   канал L-типа",
    "COX-1",
    "cox2",
    "SERT",
    "AT1-рецептор",
    "Unknown Target 42",
];

fn seeded_store(records: usize) -> InMemoryStore {
    let store = InMemoryStore::new();
    for i in 0..records {
        store
            .insert_record(NewRecord {
                domain: Domain::Target,
                raw_value: Some(RAW_TARGETS[i % RAW_TARGETS.len()].to_string()),
            })
            .unwrap();
    }
    store
}

fn bench_normalize(c: &mut Criterion) {
    c.bench_function("normalize/mixed", |b| {
        b.iter(|| {
            for raw in RAW_TARGETS {
                black_box(normalize(black_box(raw)));
            }
        });
    });
}

fn bench_resolve(c: &mut Criterion) {
    let synonyms = SynonymMap::curated().unwrap();
    let engine = CanonicalizationEngine::new(&synonyms);

    let mut group = c.benchmark_group("resolve");
    group.throughput(Throughput::Elements(RAW_TARGETS.len() as u64));
    group.bench_function("curated_targets", |b| {
        b.iter(|| {
            for raw in RAW_TARGETS {
                black_box(engine.resolve(Domain::Target, black_box(raw)));
            }
        });
    });
    group.finish();
}

fn bench_run_domain(c: &mut Criterion) {
    let canonicalizer = Canonicalizer::new(Arc::new(SynonymMap::curated().unwrap()));

    let mut group = c.benchmark_group("run_domain");
    for records in [1_000usize, 10_000] {
        group.throughput(Throughput::Elements(records as u64));
        group.bench_function(format!("first_run/{records}"), |b| {
            b.iter_batched(
                || seeded_store(records),
                |store| canonicalizer.run_domain(&store, Domain::Target).unwrap(),
                BatchSize::LargeInput,
            );
        });

        let settled = seeded_store(records);
        canonicalizer.run_domain(&settled, Domain::Target).unwrap();
        group.bench_function(format!("rerun/{records}"), |b| {
            b.iter(|| canonicalizer.run_domain(&settled, Domain::Target).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_normalize, bench_resolve, bench_run_domain);
criterion_main!(benches);
