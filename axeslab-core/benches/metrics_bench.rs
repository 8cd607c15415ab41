//! Criterion benchmarks for the metric hot paths.
//!
//! Benchmarks:
//! 1. PSI over two samples and the windowed trigger rate
//! 2. KDE dip approximation
//! 3. k-means density scoring across the candidate k range
//! 4. Temporal metrics (rolling variance + autocorrelation + half-split PSI)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use axeslab_core::{
    approximate_dip, compute_density_metrics, compute_temporal_metrics, population_stability_index,
    windowed_trigger_rate, DensityConfig, PsiConfig, TemporalConfig,
};

// ── Helpers ──────────────────────────────────────────────────────────

/// Deterministic pseudo-noise without pulling an RNG into the hot loop.
fn wave(n: usize, phase: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64 + phase;
            (t * 0.37).sin() + 0.5 * (t * 1.13).cos() + 0.01 * t
        })
        .collect()
}

fn matrix(n: usize, width: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| {
            let cluster = (i % 3) as f64 * 4.0;
            (0..width)
                .map(|j| cluster + ((i * 7 + j * 13) % 17) as f64 / 17.0)
                .collect()
        })
        .collect()
}

// ── 1. PSI ───────────────────────────────────────────────────────────

fn bench_psi(c: &mut Criterion) {
    let mut group = c.benchmark_group("psi");
    let config = PsiConfig::default();

    for &n in &[1_000, 10_000, 100_000] {
        let expected = wave(n, 0.0);
        let actual = wave(n, 50.0);
        group.bench_with_input(BenchmarkId::new("two_sample", n), &n, |b, _| {
            b.iter(|| {
                population_stability_index(black_box(&expected), black_box(&actual), &config)
            });
        });
    }

    let series = wave(5_000, 0.0);
    group.bench_function("windowed_5000_w100", |b| {
        b.iter(|| windowed_trigger_rate(black_box(&series), 100, &config));
    });

    group.finish();
}

// ── 2. Dip ───────────────────────────────────────────────────────────

fn bench_dip(c: &mut Criterion) {
    let mut group = c.benchmark_group("dip");
    for &n in &[200, 2_000, 20_000] {
        let values = wave(n, 3.0);
        group.bench_with_input(BenchmarkId::new("grid_256", n), &n, |b, _| {
            b.iter(|| approximate_dip(black_box(&values), 256));
        });
    }
    group.finish();
}

// ── 3. Density ───────────────────────────────────────────────────────

fn bench_density(c: &mut Criterion) {
    let mut group = c.benchmark_group("density");
    group.sample_size(20);
    let config = DensityConfig::default();
    for &n in &[200, 2_000] {
        let m = matrix(n, 4);
        group.bench_with_input(BenchmarkId::new("k2_to_k5", n), &n, |b, _| {
            b.iter(|| compute_density_metrics(Some(black_box(&m)), &config));
        });
    }
    group.finish();
}

// ── 4. Temporal ──────────────────────────────────────────────────────

fn bench_temporal(c: &mut Criterion) {
    let mut group = c.benchmark_group("temporal");
    let series = wave(10_000, 0.0);
    group.bench_function("10000_points", |b| {
        b.iter(|| {
            compute_temporal_metrics(
                black_box(&series),
                &TemporalConfig::default(),
                &PsiConfig::default(),
            )
        });
    });
    group.finish();
}

criterion_group!(benches, bench_psi, bench_dip, bench_density, bench_temporal);
criterion_main!(benches);
