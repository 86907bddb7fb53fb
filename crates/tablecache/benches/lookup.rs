use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use sheetstore::TableSource;
use tablecache::{CacheStore, MemoryStore, Row, TableCache, TableCacheConfig};

struct Subject {
    id: String,
    group: String,
}

impl Row for Subject {
    fn id(&self) -> &str {
        &self.id
    }
}

struct Generated(usize);

#[async_trait]
impl TableSource<Subject> for Generated {
    async fn fetch_all(&self) -> sheetstore::Result<Vec<Subject>> {
        Ok((0..self.0)
            .map(|i| Subject {
                id: format!("s{}", i),
                group: format!("g{}", i % 20),
            })
            .collect())
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn warm_cache(rt: &tokio::runtime::Runtime, rows: usize) -> TableCache<Subject> {
    let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new(64));
    let cache = TableCache::new(
        "subjects",
        Arc::new(Generated(rows)),
        store,
        &TableCacheConfig::default(),
    )
    .with_index("ByGroupId", |s: &Subject| Some(s.group.clone()));
    rt.block_on(cache.warm_up()).unwrap();
    cache
}

fn bench_warm_lookups(c: &mut Criterion) {
    let mut group = c.benchmark_group("warm_lookup");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    let rt = runtime();
    let cache = warm_cache(&rt, 1000);

    group.bench_function("read_by_id", |b| {
        let mut counter = 0usize;
        b.iter(|| {
            let id = format!("s{}", counter % 1000);
            black_box(rt.block_on(cache.read_by_id(&id)).unwrap());
            counter += 1;
        });
    });

    group.bench_function("read_by_group_key", |b| {
        let mut counter = 0usize;
        b.iter(|| {
            let key = format!("g{}", counter % 20);
            black_box(rt.block_on(cache.read_by_group_key("ByGroupId", &key)).unwrap());
            counter += 1;
        });
    });

    group.finish();
}

fn bench_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("refresh");
    group.sample_size(20);

    let rt = runtime();
    let cache = warm_cache(&rt, 5000);

    group.bench_function("refresh_5000_rows", |b| {
        b.iter(|| rt.block_on(cache.refresh()).unwrap());
    });

    group.finish();
}

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_store");
    group.throughput(Throughput::Elements(1));

    let store = MemoryStore::new(256);
    let ttl = Duration::from_secs(600);
    for i in 0..256 {
        store.set(&format!("k{}", i), Arc::new(i), ttl);
    }

    group.bench_function("try_get_hit", |b| {
        let mut counter = 0usize;
        b.iter(|| {
            black_box(store.try_get(&format!("k{}", counter % 256)));
            counter += 1;
        });
    });

    group.bench_function("set_with_eviction", |b| {
        let mut counter = 0usize;
        b.iter(|| {
            store.set(&format!("n{}", counter), Arc::new(counter), ttl);
            counter += 1;
        });
    });

    group.finish();
}

criterion_group!(benches, bench_warm_lookups, bench_refresh, bench_store);
criterion_main!(benches);
