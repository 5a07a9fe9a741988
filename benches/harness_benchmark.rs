use criterion::{criterion_group, criterion_main, Criterion};
use smokedb::config::EngineOptions;
use smokedb::fixture::create_fixture;
use smokedb::{Harness, HarnessConfig, OpenMode, Probe, SqliteStore, Store};
use std::hint::black_box;
use tempfile::TempDir;

fn bench_config(dir: &TempDir) -> HarnessConfig {
    let fixture = dir.path().join("testdb.sqlite");
    create_fixture(
        &fixture,
        "kv",
        &Probe::new("k1", 42),
        &EngineOptions::default(),
        false,
    )
    .unwrap();

    HarnessConfig {
        fixture_path: Some(fixture),
        write_path: dir.path().join("write.native"),
        delete_path: dir.path().join("delete.native"),
        ..HarnessConfig::default()
    }
}

fn harness_benchmark(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let harness = Harness::new(bench_config(&dir));

    c.bench_function("harness read", |b| {
        b.iter(|| harness.test_read().unwrap())
    });

    c.bench_function("harness write", |b| {
        b.iter(|| harness.test_write().unwrap())
    });

    c.bench_function("harness delete", |b| {
        b.iter(|| harness.test_delete().unwrap())
    });
}

fn store_benchmark(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let mut store = SqliteStore::open(
        &dir.path().join("store.sqlite"),
        "kv",
        OpenMode::ReadWriteCreate,
        &EngineOptions::default(),
    )
    .unwrap();
    store.put("k1", 42).unwrap();

    c.bench_function("sqlite get", |b| {
        b.iter(|| store.get(black_box("k1")).unwrap())
    });

    c.bench_function("sqlite put", |b| {
        b.iter(|| store.put(black_box("k2"), black_box(7)).unwrap())
    });
}

criterion_group!(benches, harness_benchmark, store_benchmark);
criterion_main!(benches);
