//! Overlap merge benchmarks
//!
//! Measures `BoundingBoxes::merge_intersection` on scattered detections and
//! on the worst case where every box touches the next one.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use table_extract_geometry::{BoundingBox, BoundingBoxes};

/// Deterministic pseudo-random boxes on a 2000x2000 page
fn scattered_boxes(count: usize, seed: u64) -> Vec<BoundingBox> {
    let mut s = seed;
    let mut next = |modulo: u64| {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((s >> 33) % modulo) as i32
    };

    (0..count)
        .map(|_| {
            let (x, y) = (next(1900), next(1900));
            let (w, h) = (next(100) + 1, next(100) + 1);
            BoundingBox::new(x, y, x + w, y + h)
                .expect("positive size")
                .with_score(next(100) as f32 / 100.0)
        })
        .collect()
}

/// Boxes forming a single staircase chain
fn chained_boxes(count: usize) -> Vec<BoundingBox> {
    (0..count as i32)
        .rev()
        .map(|i| BoundingBox::new(i * 10, i * 10, i * 10 + 10, i * 10 + 10).expect("valid"))
        .collect()
}

fn bench_merge_scattered(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_scattered");

    for count in [10usize, 50, 200] {
        let boxes = scattered_boxes(count, 42);
        group.bench_with_input(BenchmarkId::from_parameter(count), &boxes, |b, boxes| {
            b.iter_with_setup(
                || BoundingBoxes::from(boxes.clone()),
                |mut collection| {
                    collection.merge_intersection();
                    black_box(collection)
                },
            );
        });
    }

    group.finish();
}

fn bench_merge_chained(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_chained");

    for count in [10usize, 50, 200] {
        let boxes = chained_boxes(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &boxes, |b, boxes| {
            b.iter_with_setup(
                || BoundingBoxes::from(boxes.clone()),
                |mut collection| {
                    collection.merge_intersection();
                    black_box(collection)
                },
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_merge_scattered, bench_merge_chained);
criterion_main!(benches);
