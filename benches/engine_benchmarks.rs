use cache_rs::{CacheEngine, EventSink};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::Value;

fn make_engine(capacity: usize) -> CacheEngine {
    let (sink, _events) = EventSink::channel();
    CacheEngine::new(capacity, sink)
}

pub fn criterion_benchmark(c: &mut Criterion) {
    const CACHE_SIZE: usize = 1000;
    let mut group = c.benchmark_group("Cache Engine Operations");

    // Create, at capacity, no eviction needed yet.
    {
        let engine = make_engine(CACHE_SIZE * 2);
        group.bench_function("Create below capacity", |b| {
            let mut i = 0usize;
            b.iter(|| {
                let key = format!("k{i}");
                black_box(engine.create(&key, Value::from(i), None));
                i += 1;
            });
        });
    }

    // Read hit/miss against a warm engine.
    {
        let engine = make_engine(CACHE_SIZE);
        for i in 0..CACHE_SIZE {
            engine.create(&format!("k{i}"), Value::from(i), None);
        }

        group.bench_function("Read hit", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(engine.read(&format!("k{}", i % CACHE_SIZE)));
                }
            });
        });

        group.bench_function("Read miss", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(engine.read(&format!("miss{i}")));
                }
            });
        });
    }

    // Create at capacity: every insert triggers an LFU eviction.
    {
        let engine = make_engine(CACHE_SIZE);
        for i in 0..CACHE_SIZE {
            engine.create(&format!("k{i}"), Value::from(i), None);
        }

        group.bench_function("Create at capacity (forces eviction)", |b| {
            let mut i = CACHE_SIZE;
            b.iter(|| {
                black_box(engine.create(&format!("k{i}"), Value::from(i), None));
                i += 1;
            });
        });
    }

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
