//! Benchmarks for the request hot path
//!
//! This benchmark measures:
//! - Request normalization and key hashing
//! - TTL cache reads and writes at capacity
//! - A full cached request through the service

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::time::Duration;
use where_next::suggestions::default_suggestions;
use where_next::{CacheKeyBuilder, SuggestionService, TtlCache};

fn bench_key_building(c: &mut Criterion) {
    let keys = CacheKeyBuilder::new();
    let request = json!({
        "from": "  Vancouver ",
        "budgetAmount": "$2,450",
        "vibes": ["Food", "beach", "culture", "nightlife"],
        "adults": 2,
        "kids": 1,
        "startDate": "2025-07-01",
        "endDate": "2025-07-08"
    });

    c.bench_function("normalize_and_build_key", |b| {
        b.iter(|| keys.build_from_json(black_box(&request)))
    });
}

fn bench_ttl_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("ttl_cache");
    let value = default_suggestions();

    for capacity in [100usize, 1_000] {
        let cache = TtlCache::new(capacity, Duration::from_secs(3600));
        for i in 0..capacity {
            cache.insert(format!("key-{i}"), value.clone());
        }

        group.bench_with_input(BenchmarkId::new("get_hit", capacity), &cache, |b, cache| {
            b.iter(|| cache.get(black_box("key-42")))
        });
        group.bench_with_input(
            BenchmarkId::new("insert_evicting", capacity),
            &cache,
            |b, cache| {
                let mut n = 0u64;
                b.iter(|| {
                    n += 1;
                    cache.insert(format!("new-{n}"), value.clone());
                })
            },
        );
    }
    group.finish();
}

fn bench_cached_request(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = SuggestionService::builder().build().unwrap();
    let body = json!({"from": "Toronto", "budget": 3000, "vibes": ["food"]});
    rt.block_on(service.handle(&body));

    c.bench_function("cached_request", |b| {
        b.to_async(&rt).iter(|| service.handle(black_box(&body)))
    });
}

criterion_group!(benches, bench_key_building, bench_ttl_cache, bench_cached_request);
criterion_main!(benches);
