//! Benchmarks for version parsing, priority scoring and zone partitioning

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use zonal_ota_update::firmware::EcuZoneField;
use zonal_ota_update::package_manager::partition_by_zone;
use zonal_ota_update::version_manager::{VersionPolicy, update_priority};
use zonal_ota_update::{Ecu, EcuType, SemanticVersion};

fn bench_versions(c: &mut Criterion) {
    c.bench_function("version_parse", |b| {
        b.iter(|| SemanticVersion::parse(black_box("12.345.6789")).expect("parse failed"))
    });

    let policy = VersionPolicy::default();
    let current = SemanticVersion::new(1, 0, 0);
    let latest = SemanticVersion::new(2, 3, 15);
    c.bench_function("update_priority", |b| {
        b.iter(|| update_priority(&policy, black_box(&current), black_box(&latest)))
    });
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition_by_zone");

    for count in [10u16, 50, 100] {
        let targets: Vec<Ecu> = (1..=count)
            .rev()
            .map(|n| {
                Ecu::new(&format!("ECU_{n:03}"), EcuType::Generic, "1.0.0")
                    .expect("valid ecu")
                    .with_zone(format!("ZONE_{}", n % 4))
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(count), &targets, |b, targets| {
            b.iter(|| partition_by_zone(black_box(targets), &EcuZoneField, true))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_versions, bench_partition);
criterion_main!(benches);
