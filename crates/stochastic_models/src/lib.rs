//! # stochastic_models: Brownian Motions and Factor Composition (Layer 3)
//!
//! ## Layer 3 Role
//!
//! stochastic_models provides the stochastic drivers of a simulation:
//! - `NormalGenerator`: seeded standard normal sampling
//! - `IndependentIncrements`: the capability every process offers
//! - `BrownianMotion`: standard, view and correlated motions selected at
//!   construction time
//! - `SimulationConfig`: validated session configuration
//!
//! Processes never inspect the numeric representation of their increments.
//! They create values through the `RandomVariableFactory` of the session,
//! so the same process drives double, float, lazy or differentiable runs.
//!
//! ## Usage Example
//!
//! ```rust
//! use std::sync::Arc;
//! use stochastic_aad::PayloadKind;
//! use stochastic_models::{BrownianMotion, IndependentIncrements, SimulationConfig};
//!
//! let config = SimulationConfig::builder()
//!     .n_paths(2_000)
//!     .n_steps(4)
//!     .dt(0.25)
//!     .n_factors(3)
//!     .seed(42)
//!     .payload_kind(PayloadKind::Double)
//!     .build()
//!     .unwrap();
//!
//! let independent = Arc::new(config.brownian_motion(config.factory()).unwrap());
//! let correlated = BrownianMotion::correlated(
//!     Arc::clone(&independent),
//!     vec![vec![1.0, 0.0, 0.0], vec![0.5, 0.866, 0.0]],
//! )
//! .unwrap();
//!
//! assert_eq!(
//!     correlated.increment(0, 0).unwrap().to_f64_vec().unwrap(),
//!     independent.increment(0, 0).unwrap().to_f64_vec().unwrap(),
//! );
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialisation for `SimulationConfig`

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod brownian;
pub mod config;
pub mod error;
pub mod rng;

pub use brownian::{
    BrownianMotion, BrownianMotionView, CorrelatedBrownianMotion, CorrelationMatrix,
    IndependentIncrements, StandardBrownianMotion,
};
pub use config::{SimulationConfig, SimulationConfigBuilder, MAX_PATHS, MAX_STEPS};
pub use error::ConfigError;
pub use rng::NormalGenerator;
