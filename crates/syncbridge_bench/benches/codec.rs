//! Record id codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use syncbridge_bench::generate_sync_ids;
use syncbridge_codec::{base64_to_uuid4, uuid4_to_base64};

/// Benchmark sync id to UUID conversion.
fn bench_to_uuid(c: &mut Criterion) {
    let ids = generate_sync_ids(1000);

    c.bench_function("base64_to_uuid4", |b| {
        let mut i = 0;
        b.iter(|| {
            let uuid = base64_to_uuid4(black_box(&ids[i % ids.len()])).unwrap();
            i += 1;
            black_box(uuid);
        });
    });
}

/// Benchmark UUID to sync id conversion.
fn bench_to_sync_id(c: &mut Criterion) {
    let uuids: Vec<String> = generate_sync_ids(1000)
        .iter()
        .map(|id| base64_to_uuid4(id).unwrap())
        .collect();

    c.bench_function("uuid4_to_base64", |b| {
        let mut i = 0;
        b.iter(|| {
            let id = uuid4_to_base64(black_box(&uuids[i % uuids.len()])).unwrap();
            i += 1;
            black_box(id);
        });
    });
}

/// Benchmark converting whole id lists, as in `ids=` filters.
fn bench_id_lists(c: &mut Criterion) {
    let mut group = c.benchmark_group("id_list");

    for count in [10, 100, 1000] {
        let uuids: Vec<String> = generate_sync_ids(count)
            .iter()
            .map(|id| base64_to_uuid4(id).unwrap())
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &uuids, |b, uuids| {
            b.iter(|| {
                let ids: Vec<String> = uuids
                    .iter()
                    .map(|u| uuid4_to_base64(black_box(u)).unwrap())
                    .collect();
                black_box(ids);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_to_uuid, bench_to_sync_id, bench_id_lists);

criterion_main!(benches);
