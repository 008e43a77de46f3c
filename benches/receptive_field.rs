//! Criterion benchmarks for receptive-field computation and rendering.
//!
//! Run with:
//!   cargo bench
//!   cargo bench --features parallel,simd
//!
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use netscope::receptive_field::{compute_layer_grids_with, ExecutionTier};
use netscope::render::{LayoutConfig, NetworkRenderer};
use netscope::tensor::{WeightTensor, INPUT_PIXELS};

/// Deterministic weights in [-0.5, 0.5) from a xorshift stream.
fn make_weights(widths: &[usize], seed: u64) -> WeightTensor {
    let mut state = seed.max(1);
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 40) as f32 / (1u64 << 24) as f32 - 0.5
    };

    let mut fan_in = INPUT_PIXELS;
    let mut layers = Vec::with_capacity(widths.len());
    for &width in widths {
        let layer: Vec<Vec<f32>> = (0..width)
            .map(|_| (0..fan_in).map(|_| next()).collect())
            .collect();
        layers.push(layer);
        fan_in = width;
    }
    WeightTensor::new(layers)
}

/// Compare execution tiers on a typical MLP shape.
fn bench_grid_tiers(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_tier");
    let weights = make_weights(&[128, 64, 10], 42);
    group.throughput(Throughput::Elements(weights.neuron_count() as u64));

    // Simd / Parallel fall back to scalar if the feature is not enabled.
    for tier in [ExecutionTier::Scalar, ExecutionTier::Simd, ExecutionTier::Parallel] {
        let name = format!("{tier:?}").to_ascii_lowercase();
        group.bench_function(name, |b| {
            b.iter(|| black_box(compute_layer_grids_with(black_box(&weights), tier).neuron_count()))
        });
    }

    group.finish();
}

/// Grid computation with growing hidden width.
fn bench_grid_widths(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_width");

    for width in [16usize, 64, 256].iter() {
        let weights = make_weights(&[*width, *width, 10], 7);
        group.throughput(Throughput::Elements(weights.neuron_count() as u64));

        group.bench_with_input(BenchmarkId::new("scalar", width), &weights, |b, w| {
            b.iter(|| black_box(compute_layer_grids_with(w, ExecutionTier::Scalar).len()))
        });
    }

    group.finish();
}

/// Scene construction, with and without edges.
fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let weights = make_weights(&[32, 10], 3);
    let renderer = NetworkRenderer::new(LayoutConfig::default());

    group.bench_function("with_edges", |b| {
        b.iter(|| black_box(renderer.render(&weights, true).len()))
    });
    group.bench_function("nodes_only", |b| {
        b.iter(|| black_box(renderer.render(&weights, false).len()))
    });

    group.finish();
}

criterion_group!(benches, bench_grid_tiers, bench_grid_widths, bench_render);
criterion_main!(benches);
