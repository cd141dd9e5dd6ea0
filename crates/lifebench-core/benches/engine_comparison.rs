//! Engine comparison benchmarks.
//!
//! Times the sequential engine against the parallel engine on the emulated
//! device, in both device layouts, over the same soup.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lifebench_core::prelude::*;
use std::time::Duration;

/// Deterministic pseudo-random soup, about a third alive.
fn soup(size: usize) -> Grid {
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15 ^ size as u64;
    let cells: Vec<u8> = (0..size * size)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            u8::from(state % 3 == 0)
        })
        .collect();
    Grid::from_row_major(size, size, &cells).unwrap()
}

fn bench_engines(c: &mut Criterion) {
    let mut group = c.benchmark_group("evolve");
    group.measurement_time(Duration::from_secs(5));

    let iterations = 16;
    let sequential = SequentialEngine::new();
    let flat = ParallelEngine::emulated(EngineConfig::default()).unwrap();
    let rows = ParallelEngine::emulated(
        EngineConfigBuilder::new().layout(DeviceLayout::RowIndirect).build(),
    )
    .unwrap();

    for size in [64, 128, 256, 512] {
        let grid = soup(size);
        group.throughput(Throughput::Elements((size * size * iterations) as u64));

        group.bench_with_input(BenchmarkId::new("sequential", size), &grid, |b, grid| {
            b.iter(|| sequential.evolve(black_box(grid), iterations).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("parallel_flat", size), &grid, |b, grid| {
            b.iter(|| flat.evolve(black_box(grid), iterations).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("parallel_rows", size), &grid, |b, grid| {
            b.iter(|| rows.evolve(black_box(grid), iterations).unwrap())
        });
    }

    group.finish();
}

fn bench_transfer_overhead(c: &mut Criterion) {
    // Zero iterations isolates upload, allocation and download.
    let mut group = c.benchmark_group("transfer");
    let grid = soup(256);

    for layout in [DeviceLayout::Flat, DeviceLayout::RowIndirect] {
        let engine = ParallelEngine::emulated(EngineConfigBuilder::new().layout(layout).build()).unwrap();
        group.bench_function(layout.as_str(), |b| {
            b.iter(|| engine.evolve(black_box(&grid), 0).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_engines, bench_transfer_overhead);
criterion_main!(benches);
