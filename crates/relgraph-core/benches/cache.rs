use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use relgraph_core::db::open_in_memory;
use relgraph_core::relationship::{EagerOptions, eager_load};
use relgraph_core::{RelationshipsCache, Stub};
use rusqlite::{Connection, params};

const TIERS: &[(&str, i64)] = &[("small", 200), ("medium", 2_000), ("large", 10_000)];
const FANOUT: i64 = 4;

/// `controls` Control rows, each mapped to `FANOUT` objectives and one risk.
fn seeded_store(controls: i64) -> Connection {
    let mut conn = open_in_memory().expect("open store");
    let tx = conn.transaction().expect("begin");
    {
        let mut insert = tx
            .prepare(
                "INSERT INTO relationships (
                    source_type, source_id, destination_type, destination_id,
                    is_external, created_at_us, updated_at_us
                 ) VALUES (?1, ?2, ?3, ?4, 0, 1, 1)",
            )
            .expect("prepare");
        for id in 0..controls {
            for k in 0..FANOUT {
                insert
                    .execute(params!["Control", id, "Objective", id * FANOUT + k])
                    .expect("insert");
            }
            insert
                .execute(params!["Risk", id, "Control", id])
                .expect("insert");
        }
    }
    tx.commit().expect("commit");
    conn
}

fn bench_populate_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache.populate");

    for &(name, controls) in TIERS {
        let conn = seeded_store(controls);
        let stubs: Vec<Stub> = (0..controls).map(|id| Stub::new("Control", id)).collect();
        group.throughput(Throughput::Elements(stubs.len() as u64));

        group.bench_with_input(BenchmarkId::new("all_types", name), &stubs, |b, stubs| {
            b.iter(|| {
                let mut cache = RelationshipsCache::new();
                cache.populate_cache(&conn, stubs, None).expect("populate");
                black_box(cache.len())
            });
        });

        let of_types = vec!["Risk".to_string()];
        group.bench_with_input(BenchmarkId::new("of_types", name), &stubs, |b, stubs| {
            b.iter(|| {
                let mut cache = RelationshipsCache::new();
                cache
                    .populate_cache(&conn, stubs, Some(of_types.as_slice()))
                    .expect("populate");
                black_box(cache.len())
            });
        });

        group.bench_with_input(BenchmarkId::new("eager_load", name), &stubs, |b, stubs| {
            b.iter(|| {
                let eager = eager_load(&conn, stubs.as_slice(), EagerOptions::default()).expect("eager");
                black_box(eager.is_loaded())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_populate_cache);
criterion_main!(benches);
