//! # Collision Checker Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use nalgebra::Point2;
use smooth_lib::{
    collision::{CollisionChecker, CollisionParams, LinearDirection, RotationDirection},
    obstacles::{ObstacleSnapshot, Segment},
};

fn collision_benchmark(c: &mut Criterion) {
    // ---- Build a dense synthetic scan ----

    let checker = CollisionChecker::new(&CollisionParams::default()).unwrap();

    // One return per degree on an uneven room outline, with chords between
    // neighbouring returns
    let points: Vec<Point2<f64>> = (0..360)
        .map(|i| {
            let theta = (i as f64).to_radians();
            let range = 0.3 + 0.2 * (3.0 * theta).sin().abs();
            Point2::new(range * theta.cos(), range * theta.sin())
        })
        .collect();
    let segments = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(p0, p1)| Segment::new(*p0, *p1))
        .collect();

    let scan = ObstacleSnapshot { points, segments };

    c.bench_function("CollisionChecker::obstacle_linear_margin", |b| {
        b.iter(|| checker.obstacle_linear_margin(LinearDirection::Forward, &scan))
    });

    c.bench_function("CollisionChecker::obstacle_rotation_margin", |b| {
        b.iter(|| checker.obstacle_rotation_margin(RotationDirection::Left, &scan))
    });

    c.bench_function("CollisionChecker::obstacle_arc_margin", |b| {
        b.iter(|| checker.obstacle_arc_margin(0.3, 0.5, &scan))
    });
}

criterion_group!(benches, collision_benchmark);
criterion_main!(benches);
