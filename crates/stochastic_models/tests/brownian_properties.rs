//! Statistical and structural properties of composed Brownian motions.

use std::sync::Arc;

use approx::assert_relative_eq;
use proptest::prelude::*;
use rayon::prelude::*;
use stochastic_aad::{PayloadKind, RandomVariable, RandomVariableFactory, Tape};
use stochastic_core::{SimulationError, TimeDiscretization};
use stochastic_models::{BrownianMotion, IndependentIncrements, SimulationConfig};

fn independent(
    n_factors: usize,
    n_paths: usize,
    seed: u64,
    factory: RandomVariableFactory,
) -> Arc<BrownianMotion> {
    let times = Arc::new(TimeDiscretization::uniform(0.0, 3, 1.0).unwrap());
    Arc::new(BrownianMotion::standard(times, n_factors, n_paths, seed, factory).unwrap())
}

fn correlation(a: &RandomVariable, b: &RandomVariable) -> f64 {
    a.covariance(b).unwrap() / (a.variance().unwrap() * b.variance().unwrap()).sqrt()
}

fn values(x: &RandomVariable) -> Vec<f64> {
    x.to_f64_vec().unwrap()
}

#[test]
fn test_three_factor_scenario() {
    let config = SimulationConfig::builder()
        .n_paths(20_000)
        .n_steps(3)
        .dt(1.0)
        .n_factors(3)
        .seed(42)
        .build()
        .unwrap();
    let input = Arc::new(config.brownian_motion(config.factory()).unwrap());
    let output = BrownianMotion::correlated(
        Arc::clone(&input),
        vec![vec![1.0, 0.0, 0.0], vec![0.5, 0.866, 0.0]],
    )
    .unwrap();

    assert_eq!(output.number_of_factors(), 2);
    for t in 0..3 {
        let u0 = input.brownian_increment(t, 0).unwrap();
        let w0 = output.brownian_increment(t, 0).unwrap();
        let w1 = output.brownian_increment(t, 1).unwrap();

        assert_eq!(values(&w0), values(&u0));
        let rho = correlation(&w1, &u0);
        assert!((rho - 0.5).abs() < 0.02, "correlation {} at step {}", rho, t);
    }
}

#[test]
fn test_orthonormal_loadings_preserve_covariance() {
    let loadings = vec![
        vec![0.6, 0.8, 0.0],
        vec![-0.8, 0.6, 0.0],
        vec![0.0, 0.0, 1.0],
    ];
    let input = independent(3, 20_000, 7, RandomVariableFactory::default());
    let output = BrownianMotion::correlated(input, loadings.clone()).unwrap();

    let increments = output.increments(1).unwrap();
    for i in 0..3 {
        for k in 0..3 {
            let expected: f64 = (0..3).map(|j| loadings[i][j] * loadings[k][j]).sum();
            let empirical = increments[i].covariance(&increments[k]).unwrap();
            assert!(
                (empirical - expected).abs() < 0.04,
                "cov({}, {}) = {}, expected {}",
                i,
                k,
                empirical,
                expected
            );
        }
    }
}

#[test]
fn test_seed_clones_are_deterministic() {
    let input = independent(2, 500, 1, RandomVariableFactory::default());
    let process = BrownianMotion::correlated(input, vec![vec![0.3, 0.7], vec![1.0, -1.0]]).unwrap();
    let before: Vec<Vec<f64>> = (0..3).map(|t| values(&process.increment(t, 1).unwrap())).collect();

    let a = process.clone_with_modified_seed(1234);
    let b = process.clone_with_modified_seed(1234);
    for t in 0..3 {
        for f in 0..2 {
            assert_eq!(values(&a.increment(t, f).unwrap()), values(&b.increment(t, f).unwrap()));
        }
        assert_eq!(values(&process.increment(t, 1).unwrap()), before[t]);
        assert_ne!(values(&a.increment(t, 1).unwrap()), before[t]);
    }
}

#[test]
fn test_time_discretization_clone() {
    let input = independent(1, 100, 3, RandomVariableFactory::default());
    let view = BrownianMotion::view(input, vec![0]).unwrap();
    let finer = Arc::new(TimeDiscretization::uniform(0.0, 12, 0.25).unwrap());

    let regridded = view.clone_with_modified_time_discretization(finer);
    assert_eq!(regridded.time_discretization().number_of_time_steps(), 12);
    assert_eq!(regridded.increment(11, 0).unwrap().filtration_time(), 3.0);
    assert_eq!(view.time_discretization().number_of_time_steps(), 3);
}

#[test]
fn test_payload_kinds_agree() {
    let loadings = vec![vec![0.25, -0.5, 0.75]];
    let run = |kind| {
        let input = independent(3, 64, 11, RandomVariableFactory::new(kind));
        let output = BrownianMotion::correlated(input, loadings.clone()).unwrap();
        values(&output.increment(2, 0).unwrap())
    };

    let double = run(PayloadKind::Double);
    assert_eq!(run(PayloadKind::Lazy), double);
    assert_eq!(run(PayloadKind::Differentiable), double);

    for (x, y) in run(PayloadKind::Float).iter().zip(&double) {
        assert_relative_eq!(*x, *y, epsilon = 1e-5);
    }
}

#[test]
fn test_sensitivity_through_correlated_increments() {
    let factory = RandomVariableFactory::new(PayloadKind::Differentiable);
    let input = independent(2, 32, 5, factory.clone());
    let output = BrownianMotion::correlated(input, vec![vec![0.6, 0.8]]).unwrap();

    let volatility = factory.create(0.0, 0.2).unwrap();
    let dw = output.brownian_increment(0, 0).unwrap();
    let diffusion = volatility.mult(&dw).unwrap();

    let gradient = diffusion.as_differentiable().unwrap().gradient().unwrap();
    let volatility_id = volatility.as_differentiable().unwrap().id();
    assert_eq!(gradient.len(), 1);
    assert_eq!(gradient[&volatility_id].to_f64_vec(), values(&dw));

    let tape = factory.tape().unwrap();
    assert_eq!(tape.ids_of_variables_in_list(), vec![volatility_id]);
}

#[test]
fn test_session_runs_after_reset() {
    let session = Tape::shared();
    let factory = RandomVariableFactory::with_tape(Arc::clone(&session));
    let input = independent(2, 4, 8, factory.clone());
    let output = BrownianMotion::correlated(Arc::clone(&input), vec![vec![0.6, 0.8]]).unwrap();
    let cached = input.brownian_increment(0, 1).unwrap();
    output.brownian_increment(0, 0).unwrap();

    session.reset();
    let volatility = factory.create(0.0, 0.2).unwrap();
    assert!(matches!(
        volatility.mult(&cached),
        Err(SimulationError::GraphInvariant(_))
    ));
    assert!(matches!(
        output.brownian_increment(0, 0),
        Err(SimulationError::Calculation { time_index: 0, factor: 0, .. })
    ));

    // The next run records its own grid with the same numbers.
    let rerun = output.clone_with_modified_seed(8);
    let dw = rerun.brownian_increment(0, 0).unwrap();
    let diffusion = volatility.mult(&dw).unwrap();
    let gradient = diffusion.as_differentiable().unwrap().gradient().unwrap();
    let volatility_id = volatility.as_differentiable().unwrap().id();
    assert_eq!(gradient.len(), 1);
    assert_eq!(gradient[&volatility_id].to_f64_vec(), values(&dw));
    assert_eq!(session.ids_of_variables_in_list(), vec![volatility_id]);
}

#[test]
fn test_concurrent_reads_generate_once() {
    let input = independent(2, 1_000, 99, RandomVariableFactory::default());
    let reference = values(&input.increment(2, 1).unwrap());

    let fresh = Arc::new(input.clone_with_modified_seed(99));
    let reads: Vec<Vec<f64>> = (0..32)
        .into_par_iter()
        .map(|_| values(&fresh.increment(2, 1).unwrap()))
        .collect();

    assert!(reads.iter().all(|r| *r == reference));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_view_delegates_to_upstream(
        factor_map in prop::collection::vec(0usize..4, 1..6),
        time_index in 0usize..3,
        seed in any::<u64>(),
    ) {
        let upstream = independent(4, 16, seed, RandomVariableFactory::default());
        let view = BrownianMotion::view(Arc::clone(&upstream), factor_map.clone()).unwrap();

        prop_assert_eq!(view.number_of_factors(), factor_map.len());
        for (factor, &mapped) in factor_map.iter().enumerate() {
            prop_assert_eq!(
                values(&view.brownian_increment(time_index, factor).unwrap()),
                values(&upstream.brownian_increment(time_index, mapped).unwrap())
            );
        }
    }
}
