//! Benchmarks for bilinear grid sampling.
//!
//! Run with: cargo bench --package field-sampler

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use field_sampler::GridSampler;
use rand::Rng;
use test_utils::{lat_lon_header, random_wind_grid, temperature_grid};

fn random_queries(n: usize, lon: (f64, f64), lat: (f64, f64)) -> Vec<(f64, f64)> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| (rng.gen_range(lon.0..lon.1), rng.gen_range(lat.0..lat.1)))
        .collect()
}

// =============================================================================
// SCALAR SAMPLING
// =============================================================================

fn bench_scalar_interpolate(c: &mut Criterion) {
    let mut group = c.benchmark_group("scalar_interpolate");

    for &(width, height, name) in &[(160usize, 120usize, "small"), (1440, 721, "global_quarter_degree")] {
        let header = lat_lon_header(0.0, 90.0, 0.25, width, height);
        let sampler = GridSampler::build(Arc::new(temperature_grid(header)));
        let bbox = header.bbox();
        let queries = random_queries(10_000, (bbox.min_x, bbox.max_x), (bbox.min_y, bbox.max_y));

        group.throughput(Throughput::Elements(queries.len() as u64));
        group.bench_with_input(BenchmarkId::new(name, queries.len()), &queries, |b, queries| {
            b.iter(|| {
                for &(lon, lat) in queries {
                    black_box(sampler.scalar_at(lon, lat));
                }
            })
        });
    }

    group.finish();
}

// =============================================================================
// VECTOR SAMPLING
// =============================================================================

fn bench_vector_interpolate(c: &mut Criterion) {
    let mut group = c.benchmark_group("vector_interpolate");

    let header = lat_lon_header(120.0, 45.0, 0.1, 400, 300);
    let sampler = GridSampler::build(Arc::new(random_wind_grid(header, 20.0, 1)));
    let bbox = header.bbox();
    let queries = random_queries(10_000, (bbox.min_x, bbox.max_x), (bbox.min_y, bbox.max_y));

    group.throughput(Throughput::Elements(queries.len() as u64));
    group.bench_function("random_wind", |b| {
        b.iter(|| {
            for &(lon, lat) in &queries {
                black_box(sampler.vector_at(lon, lat));
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_scalar_interpolate, bench_vector_interpolate);
criterion_main!(benches);
