//! # stochastic_core: Foundation for Monte Carlo Simulation
//!
//! ## Layer 1 (Foundation) Role
//!
//! stochastic_core is the bottom layer of the workspace and provides:
//! - Error taxonomy shared by every layer (`error`)
//! - Immutable time discretisation (`time`)
//! - Path-wise numeric payload with pure arithmetic (`values`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other stochastic_* crates, with minimal
//! external dependencies:
//! - num-traits: generic floating-point arithmetic over `f64` and `f32`
//! - thiserror: error derivation
//! - rayon: element-wise parallelism for large path vectors
//! - serde: serialisation support (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use stochastic_core::{PathValues, TimeDiscretization};
//!
//! let td = TimeDiscretization::uniform(0.0, 2, 0.5).unwrap();
//! let dt = td.time_step(0).unwrap();
//!
//! let w = PathValues::from_paths(td.time(1).unwrap(), vec![0.1_f64, -0.2, 0.3]).unwrap();
//! let scaled = w.mult_scalar(dt.sqrt());
//! assert_eq!(scaled.size(), 3);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialisation for `TimeDiscretization`

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod error;
pub mod time;
pub mod values;

pub use error::{check_index, Result, SimulationError};
pub use time::TimeDiscretization;
pub use values::{PathValues, Real, PARALLEL_THRESHOLD};
