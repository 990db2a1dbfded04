//! Subtraction and mesh extraction benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stockcut_math::Point3;
use stockcut_octree::Octree;
use stockcut_volume::{Cuboid, Sphere};

/// Stock with a ball cut out of one corner.
fn carved_stock(max_depth: u32) -> Octree {
    let mut stock = Octree::new(10.0, max_depth, Point3::origin()).unwrap();
    let ball = Sphere::new(Point3::new(10.0, 10.0, 10.0), 9.0).unwrap();
    stock.subtract(&ball).unwrap();
    stock
}

fn bench_sphere_subtract(c: &mut Criterion) {
    let mut group = c.benchmark_group("subtract sphere");
    for depth in [4u32, 5, 6] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let ball = Sphere::new(Point3::new(10.0, 10.0, 10.0), 9.0).unwrap();
            b.iter(|| {
                let mut stock = Octree::new(10.0, depth, Point3::origin()).unwrap();
                black_box(stock.subtract(black_box(&ball)).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_pocket_subtract(c: &mut Criterion) {
    let pocket = Cuboid::from_bounds([-4.0, -4.0, 2.0, 4.0, 4.0, 20.0]).unwrap();
    c.bench_function("subtract pocket (depth 6)", |b| {
        b.iter(|| {
            let mut stock = Octree::new(10.0, 6, Point3::origin()).unwrap();
            black_box(stock.subtract(black_box(&pocket)).unwrap())
        })
    });
}

fn bench_polyline(c: &mut Criterion) {
    let path: Vec<Point3> = (0..=20)
        .map(|i| {
            let t = i as f64 / 20.0;
            Point3::new(-12.0 + 24.0 * t, 6.0 * (t * 6.0).sin(), 9.0)
        })
        .collect();
    c.bench_function("subtract polyline (21 points, depth 5)", |b| {
        b.iter(|| {
            let mut stock = Octree::new(10.0, 5, Point3::origin()).unwrap();
            black_box(stock.subtract_polyline(black_box(&path), 1.5).unwrap())
        })
    });
}

fn bench_extraction(c: &mut Criterion) {
    let stock = carved_stock(6);
    c.bench_function("surface_mesh (depth 6)", |b| {
        b.iter(|| black_box(stock.surface_mesh()))
    });
    c.bench_function("to_mesh (depth 6)", |b| b.iter(|| black_box(stock.to_mesh())));
}

criterion_group!(
    benches,
    bench_sphere_subtract,
    bench_pocket_subtract,
    bench_polyline,
    bench_extraction
);
criterion_main!(benches);
