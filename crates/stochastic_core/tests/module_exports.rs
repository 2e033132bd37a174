//! Integration tests for the public surface of stochastic_core.

use approx::assert_relative_eq;
use proptest::prelude::*;
use stochastic_core::{PathValues, SimulationError, TimeDiscretization};

#[test]
fn test_reexports_are_usable() {
    let td = TimeDiscretization::uniform(0.0, 3, 1.0).unwrap();
    assert_eq!(td.as_slice(), &[0.0, 1.0, 2.0, 3.0]);

    let v = PathValues::scalar(td.last_time(), 1.0_f64);
    assert!(v.is_deterministic());

    let err: SimulationError = td.time(4).unwrap_err();
    assert!(matches!(err, SimulationError::IndexOutOfRange { what: "time", .. }));
}

#[test]
fn test_float_payload_arithmetic() {
    let x = PathValues::from_paths(0.0, vec![1.0_f32, 2.0, 3.0]).unwrap();
    let y = x.add_product_scalar(&x, 0.5).unwrap();
    assert_eq!(y.to_f64_vec(), vec![1.5, 3.0, 4.5]);
    assert_relative_eq!(y.average(), 3.0_f32);
}

proptest! {
    #[test]
    fn test_covariance_with_self_is_variance(values in prop::collection::vec(-1e3..1e3_f64, 2..64)) {
        let x = PathValues::from_paths(0.0, values).unwrap();
        let cov = x.covariance(&x).unwrap();
        prop_assert!((cov - x.variance()).abs() <= 1e-9 * (1.0 + x.variance().abs()));
    }

    #[test]
    fn test_uniform_grid_steps(n_steps in 1usize..200, dt in 1e-4..1.0_f64) {
        let td = TimeDiscretization::uniform(0.0, n_steps, dt).unwrap();
        prop_assert_eq!(td.number_of_time_steps(), n_steps);
        for i in 0..n_steps {
            prop_assert!((td.time_step(i).unwrap() - dt).abs() < 1e-9);
        }
    }
}
