//! Random variable factory.
//!
//! A [`RandomVariableFactory`] decides once, at construction, which numeric
//! representation backs every random variable it creates. Code that only
//! needs to create values (processes, models) takes a factory and never
//! inspects the representation.
//!
//! ## Differentiable kinds
//!
//! - [`PayloadKind::Differentiable`]: each factory owns a private tape.
//! - [`PayloadKind::UniqueTape`]: the factory records into a session tape
//!   that can be shared by several factories via
//!   [`RandomVariableFactory::with_tape`]; cloning the factory shares it too.
//!
//! For both, `create`/`create_from_paths` register independent variables,
//! while `create_constant`/`create_non_parameter` register constants that
//! do not count towards the sensitivity vector.

use std::sync::Arc;

use stochastic_core::{PathValues, Result};
use tracing::debug;

use crate::kind::PayloadKind;
use crate::lazy::LazyRandomVariable;
use crate::random_variable::RandomVariable;
use crate::tape::Tape;
use crate::variable::AadVariable;

/// Creation point for random variables of one payload kind.
///
/// # Examples
///
/// ```
/// use stochastic_aad::{PayloadKind, RandomVariableFactory, Tape};
///
/// let session = Tape::shared();
/// let factory = RandomVariableFactory::with_tape(session.clone());
///
/// let volatility = factory.create(0.0, 0.2).unwrap();
/// let increment = factory.create_non_parameter(1.0, vec![0.1, -0.3]).unwrap();
/// let _diffusion = increment.mult(&volatility).unwrap();
///
/// assert_eq!(factory.kind(), PayloadKind::UniqueTape);
/// assert_eq!(session.len(), 3);
/// assert_eq!(session.ids_of_variables_in_list(), vec![0]);
/// ```
#[derive(Clone, Debug)]
pub struct RandomVariableFactory {
    kind: PayloadKind,
    tape: Option<Arc<Tape>>,
}

impl Default for RandomVariableFactory {
    fn default() -> Self {
        Self::new(PayloadKind::Double)
    }
}

impl RandomVariableFactory {
    /// Create a factory for `kind`.
    ///
    /// Differentiable kinds get a fresh tape.
    pub fn new(kind: PayloadKind) -> Self {
        let tape = kind.is_differentiable().then(Tape::shared);
        debug!(%kind, "created random variable factory");
        Self { kind, tape }
    }

    /// Create a [`PayloadKind::UniqueTape`] factory recording into `tape`.
    pub fn with_tape(tape: Arc<Tape>) -> Self {
        Self {
            kind: PayloadKind::UniqueTape,
            tape: Some(tape),
        }
    }

    /// Payload kind of every value created by this factory.
    #[inline]
    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    /// Tape of differentiable factories.
    #[inline]
    pub fn tape(&self) -> Option<&Arc<Tape>> {
        self.tape.as_ref()
    }

    /// Deterministic constant known at any time.
    pub fn create_constant(&self, value: f64) -> Result<RandomVariable> {
        self.wrap(PathValues::constant(value), true)
    }

    /// Deterministic value at `time`; an independent variable for differentiable kinds.
    pub fn create(&self, time: f64, value: f64) -> Result<RandomVariable> {
        self.wrap(PathValues::scalar(time, value), false)
    }

    /// Path-wise value at `time`; an independent variable for differentiable kinds.
    pub fn create_from_paths(&self, time: f64, values: Vec<f64>) -> Result<RandomVariable> {
        self.wrap(PathValues::from_paths(time, values)?, false)
    }

    /// Path-wise value at `time` that is never differentiated against.
    pub fn create_non_parameter(&self, time: f64, values: Vec<f64>) -> Result<RandomVariable> {
        self.wrap(PathValues::from_paths(time, values)?, true)
    }

    /// Path-wise value with explicit constancy.
    ///
    /// The flag only matters for differentiable kinds.
    pub fn create_with_constancy(
        &self,
        time: f64,
        values: Vec<f64>,
        is_constant: bool,
    ) -> Result<RandomVariable> {
        self.wrap(PathValues::from_paths(time, values)?, is_constant)
    }

    /// One deterministic value per entry of `values`.
    pub fn create_vector(&self, time: f64, values: &[f64]) -> Result<Vec<RandomVariable>> {
        values.iter().map(|&v| self.create(time, v)).collect()
    }

    /// One deterministic value per entry of `rows`.
    pub fn create_matrix(&self, time: f64, rows: &[Vec<f64>]) -> Result<Vec<Vec<RandomVariable>>> {
        rows.iter().map(|row| self.create_vector(time, row)).collect()
    }

    fn wrap(&self, values: PathValues<f64>, is_constant: bool) -> Result<RandomVariable> {
        // Constructors attach a tape exactly to the differentiable kinds.
        if let Some(tape) = &self.tape {
            let variable = AadVariable::leaf(tape, values, is_constant)?;
            return Ok(RandomVariable::Differentiable(variable));
        }
        Ok(match self.kind {
            PayloadKind::Float => RandomVariable::Float(values.cast()),
            PayloadKind::Lazy => RandomVariable::Lazy(LazyRandomVariable::from_values(values)),
            _ => RandomVariable::Double(values),
        })
    }
}
