//! Benchmarks for key lookup and partition table rebuilds.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use keel_placement::{Blake3Hasher, Node, PlacementConfig, WeightedRing};

fn members(n: usize) -> Vec<Node> {
    (0..n)
        .map(|i| Node::new(format!("node-{i}"), (i % 4 + 1) as i64))
        .collect()
}

fn config(partition_count: u64) -> PlacementConfig {
    PlacementConfig {
        partition_count,
        replication_factor: 20,
        load: 1.25,
    }
}

fn bench_locate(c: &mut Criterion) {
    let ring = WeightedRing::new(members(16), config(271), Blake3Hasher).unwrap();
    let keys: Vec<Vec<u8>> = (0..1024u32)
        .map(|i| format!("key-{i}").into_bytes())
        .collect();

    let mut group = c.benchmark_group("lookup");
    group.bench_function("locate_key", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % keys.len();
            ring.locate_key(&keys[i])
        });
    });
    group.bench_function("closest_n_3", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % keys.len();
            ring.closest_n(&keys[i], 3).unwrap()
        });
    });
    group.finish();
}

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebuild");
    for &(nodes, partitions) in &[(8usize, 271u64), (32, 1021), (64, 4093)] {
        let label = format!("n{nodes}_p{partitions}");
        group.bench_with_input(
            BenchmarkId::new("add_remove", &label),
            &(nodes, partitions),
            |b, &(nodes, partitions)| {
                let ring = WeightedRing::new(members(nodes), config(partitions), Blake3Hasher)
                    .unwrap();
                b.iter(|| {
                    ring.add(Node::new("newcomer", 2)).unwrap();
                    ring.remove("newcomer").unwrap();
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_locate, bench_rebuild);
criterion_main!(benches);
