//! # stochastic_aad: Random Variables and Adjoint Differentiation (Layer 2)
//!
//! ## Layer 2 Role
//!
//! stochastic_aad provides the value layer every process and consumer works
//! with:
//! - `RandomVariable`: tagged payload over the supported numeric
//!   representations (double, float, lazy, differentiable)
//! - `RandomVariableFactory`: single creation point configured by a
//!   `PayloadKind` chosen once per session
//! - `Tape`: append-only computation graph of a differentiation session,
//!   with a reverse sweep for sensitivities
//!
//! ## Data Flow
//!
//! ```text
//! process increments --factory--> RandomVariable --arithmetic--> RandomVariable
//!                                       |                              |
//!                                       +----- Tape nodes (AAD) -------+
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use stochastic_aad::{PayloadKind, RandomVariableFactory};
//!
//! let factory = RandomVariableFactory::new(PayloadKind::Differentiable);
//! let spot = factory.create(0.0, 100.0).unwrap();
//! let shock = factory.create_non_parameter(1.0, vec![0.5, -0.25]).unwrap();
//!
//! let shocked = spot.add_product(&spot, &shock).unwrap(); // S * (1 + dW)
//! let delta = shocked.as_differentiable().unwrap().gradient().unwrap();
//!
//! let spot_id = spot.as_differentiable().unwrap().id();
//! assert_eq!(delta[&spot_id].to_f64_vec(), vec![1.5, 0.75]);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialisation for `PayloadKind`

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod factory;
pub mod kind;
pub mod lazy;
mod ops;
pub mod random_variable;
pub mod tape;
pub mod variable;

pub use factory::RandomVariableFactory;
pub use kind::{ParsePayloadKindError, PayloadKind};
pub use lazy::LazyRandomVariable;
pub use random_variable::RandomVariable;
pub use tape::{NodeHandle, Operation, Tape, TapeNode, TapeState};
pub use variable::AadVariable;
