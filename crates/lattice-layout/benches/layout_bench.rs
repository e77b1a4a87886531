//! Benchmarks for grid recalculation.
//!
//! Run with: cargo bench -p lattice-layout --bench layout_bench

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use lattice_layout::resize::distribute;
use lattice_layout::{AxisMetrics, Canvas, GridLayoutManager, Rect};

/// `rows` × `cols` grid, every cell bordered, every fourth cell spanning two
/// columns.
fn bordered_grid(rows: usize, cols: usize) -> GridLayoutManager {
    let grid = GridLayoutManager::new();
    {
        let mut lock = grid.lock();
        lock.outer_border("thick_0%").expect("theme border");
        for r in 0..rows {
            let mut row = lock.append_row();
            let mut c = 0;
            while c < cols {
                let span = if (r + c) % 4 == 0 && c + 1 < cols { 2 } else { 1 };
                let canvas = Canvas::new(
                    AxisMetrics::at_least(4, 8 + (c as u32 % 5)),
                    AxisMetrics::exact(1),
                );
                row.colspan(span)
                    .border("thin_0%")
                    .expect("theme border")
                    .create(Arc::new(canvas))
                    .expect("cell");
                c += span;
            }
        }
    }
    grid
}

fn bench_recalculate(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid/recalculate");
    for &(rows, cols) in &[(4usize, 4usize), (16, 8), (64, 12)] {
        let grid = bordered_grid(rows, cols);
        group.throughput(Throughput::Elements((rows * cols) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{rows}x{cols}")),
            &grid,
            |b, grid| {
                let mut width = 200;
                b.iter(|| {
                    // Alternate widths so every pass repositions.
                    width = if width == 200 { 240 } else { 200 };
                    black_box(grid.set_container(Rect::new(0, 0, width, 400)))
                })
            },
        );
    }
    group.finish();
}

fn bench_corner_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid/resolve_cached");
    let grid = bordered_grid(32, 8);
    group.bench_function("32x8", |b| {
        b.iter(|| black_box(grid.lock().resolve()))
    });
    group.finish();
}

fn bench_distribute(c: &mut Criterion) {
    let mut group = c.benchmark_group("resize/distribute");
    for &count in &[4usize, 32, 256] {
        let references: Vec<u32> = (0..count as u32).map(|i| 50 + i * 7 % 113).collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &references, |b, refs| {
            b.iter(|| black_box(distribute(black_box(refs), 1920)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_recalculate,
    bench_corner_cache,
    bench_distribute
);
criterion_main!(benches);
