//! Throughput of `FemtoShipper::accept` with an in-memory transport.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use femtoship::test_utils::{CollectingSink, RecordingTransport};
use femtoship::{FemtoShipper, ShipperConfig};

const ENTRIES: u64 = 10_000;

fn shipper(batch_size: usize) -> FemtoShipper {
    let config = ShipperConfig {
        url: "http://bench.local".into(),
        organization: "default".into(),
        stream: "bench".into(),
        batch_size,
        silent_success: true,
        ..Default::default()
    };
    FemtoShipper::with_parts(
        config,
        Arc::new(RecordingTransport::new()),
        Arc::new(CollectingSink::new()),
    )
    .expect("valid bench config")
}

fn bench_accept(c: &mut Criterion) {
    let mut group = c.benchmark_group("accept");
    group.throughput(Throughput::Elements(ENTRIES));
    let entry = "{\"level\":\"info\",\"msg\":\"benchmark entry\"}\n";
    for batch_size in [10usize, 100, 1_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &batch_size| {
                b.iter_with_large_drop(|| {
                    let shipper = shipper(batch_size);
                    for _ in 0..ENTRIES {
                        shipper.accept(black_box(entry)).expect("accept");
                    }
                    shipper
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_accept);
criterion_main!(benches);
