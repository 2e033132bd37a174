//! Criterion benchmarks for Brownian increment generation and correlation.
//!
//! Measures lazy generation of the independent increment grid and the cost
//! of combining upstream factors per payload kind.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stochastic_aad::{PayloadKind, RandomVariableFactory};
use stochastic_core::TimeDiscretization;
use stochastic_models::{BrownianMotion, IndependentIncrements};

fn independent(n_paths: usize, kind: PayloadKind) -> Arc<BrownianMotion> {
    let times = Arc::new(TimeDiscretization::uniform(0.0, 12, 1.0 / 12.0).unwrap());
    Arc::new(
        BrownianMotion::standard(times, 3, n_paths, 42, RandomVariableFactory::new(kind)).unwrap(),
    )
}

/// Benchmark generation of the full independent grid.
fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("brownian_generation");

    for n_paths in [1_000, 10_000, 100_000] {
        let template = independent(n_paths, PayloadKind::Double);
        group.bench_with_input(BenchmarkId::new("double", n_paths), &template, |b, template| {
            b.iter(|| {
                let fresh = template.clone_with_modified_seed(black_box(7));
                fresh.increment(0, 0).unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark one materialised correlated increment per payload kind, grid
/// pre-generated.
fn bench_correlated_increment(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlated_increment");
    let loadings = vec![vec![1.0, 0.0, 0.0], vec![0.5, 0.866, 0.0], vec![0.2, 0.3, 0.9]];

    for kind in [PayloadKind::Double, PayloadKind::Float, PayloadKind::Lazy] {
        let input = independent(50_000, kind);
        input.increments(5).unwrap();
        let output = BrownianMotion::correlated(input, loadings.clone()).unwrap();

        group.bench_with_input(BenchmarkId::new(kind.as_str(), 50_000), &output, |b, output| {
            b.iter(|| {
                output
                    .brownian_increment(black_box(5), black_box(2))
                    .and_then(|dw| dw.values())
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generation, bench_correlated_increment);
criterion_main!(benches);
