//! Noise sampler benchmarks.
//!
//! Terrain classification takes one height sample per column and up to one
//! 3D threshold test per subsurface voxel, so these paths dominate chunk
//! generation time.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strata_procedural::noise::{diamond_square, NoiseField};

fn bench_perlin2d(c: &mut Criterion) {
    let noise = NoiseField::new(42);

    c.bench_function("perlin2d", |b| {
        let mut i = 0.0;
        b.iter(|| {
            i += 1.0;
            black_box(noise.perlin2d(black_box(i), black_box(i * 0.7), 0.0, 50.0))
        });
    });
}

fn bench_layered_perlin2d(c: &mut Criterion) {
    let noise = NoiseField::new(42);

    c.bench_function("layered_perlin2d_3", |b| {
        let mut i = 0.0;
        b.iter(|| {
            i += 1.0;
            black_box(noise.layered_perlin2d(black_box(i), black_box(i * 0.7), 0.01, 0.1, 50.0, 3))
        });
    });
}

fn bench_perlin3d_threshold(c: &mut Criterion) {
    let noise = NoiseField::new(42);

    c.bench_function("perlin3d_above_threshold", |b| {
        let mut i = 0.0;
        b.iter(|| {
            i += 1.0;
            black_box(noise.perlin3d_above_threshold(
                black_box([i, i * 0.5, i * 0.25]),
                0.0,
                0.1,
                0.55,
            ))
        });
    });
}

fn bench_diamond_square(c: &mut Criterion) {
    c.bench_function("diamond_square_256", |b| {
        b.iter(|| black_box(diamond_square(256, 1.5, black_box(42))));
    });
}

criterion_group!(
    benches,
    bench_perlin2d,
    bench_layered_perlin2d,
    bench_perlin3d_threshold,
    bench_diamond_square
);
criterion_main!(benches);
