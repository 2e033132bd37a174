//! Tagged random-variable payload.
//!
//! [`RandomVariable`] is the value type flowing between processes and
//! consumers. Each variant is one numeric representation; all variants offer
//! the same arithmetic and the same read API. Operands of one expression must
//! share the variant, since mixing representations inside a session has no
//! defined meaning.

use stochastic_core::{PathValues, Result, SimulationError};

use crate::lazy::LazyRandomVariable;
use crate::ops::{BinaryOp, ScalarOp};
use crate::tape::Operation;
use crate::variable::AadVariable;

/// Random variable in one of the supported numeric representations.
///
/// # Examples
///
/// ```
/// use stochastic_aad::RandomVariable;
/// use stochastic_core::PathValues;
///
/// let x = RandomVariable::Double(PathValues::from_paths(0.0, vec![1.0, 3.0]).unwrap());
/// let y = x.mult_scalar(2.0).unwrap().add(&x).unwrap();
/// assert_eq!(y.to_f64_vec().unwrap(), vec![3.0, 9.0]);
/// assert!((y.average().unwrap() - 6.0).abs() < 1e-15);
/// ```
#[derive(Clone, Debug)]
pub enum RandomVariable {
    /// Double-precision path values.
    Double(PathValues<f64>),
    /// Single-precision path values.
    Float(PathValues<f32>),
    /// Deferred operation tree.
    Lazy(LazyRandomVariable),
    /// Differentiable value recorded on a tape.
    Differentiable(AadVariable),
}

impl RandomVariable {
    /// Name of the representation.
    pub fn kind_name(&self) -> &'static str {
        match self {
            RandomVariable::Double(_) => "double",
            RandomVariable::Float(_) => "float",
            RandomVariable::Lazy(_) => "lazy",
            RandomVariable::Differentiable(_) => "differentiable",
        }
    }

    /// Filtration time.
    pub fn filtration_time(&self) -> f64 {
        match self {
            RandomVariable::Double(v) => v.filtration_time(),
            RandomVariable::Float(v) => v.filtration_time(),
            RandomVariable::Lazy(v) => v.filtration_time(),
            RandomVariable::Differentiable(v) => v.value().filtration_time(),
        }
    }

    /// Materialised `f64` path values.
    ///
    /// Forces evaluation of lazy values and widens single-precision values.
    pub fn values(&self) -> Result<PathValues<f64>> {
        match self {
            RandomVariable::Double(v) => Ok(v.clone()),
            RandomVariable::Float(v) => Ok(v.cast()),
            RandomVariable::Lazy(v) => v.evaluate(),
            RandomVariable::Differentiable(v) => Ok(v.value().clone()),
        }
    }

    /// The differentiable view of the value, if it is one.
    pub fn as_differentiable(&self) -> Option<&AadVariable> {
        match self {
            RandomVariable::Differentiable(v) => Some(v),
            _ => None,
        }
    }

    /// `true` if the value is the same on every path.
    pub fn is_deterministic(&self) -> Result<bool> {
        Ok(self.values()?.is_deterministic())
    }

    /// Number of stored values (1 for deterministic values).
    pub fn size(&self) -> Result<usize> {
        Ok(self.values()?.size())
    }

    /// Value on `path`.
    pub fn get(&self, path: usize) -> Result<f64> {
        self.values()?.get(path)
    }

    /// All values as `f64`.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>> {
        Ok(self.values()?.to_f64_vec())
    }

    /// Mean across paths.
    pub fn average(&self) -> Result<f64> {
        Ok(self.values()?.average())
    }

    /// Population variance across paths.
    pub fn variance(&self) -> Result<f64> {
        Ok(self.values()?.variance())
    }

    /// Population covariance across paths.
    ///
    /// Reading statistics does not combine payloads, so operands of
    /// different representations are accepted.
    pub fn covariance(&self, other: &Self) -> Result<f64> {
        self.values()?.covariance(&other.values()?)
    }

    /// `self + other`
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.binary(BinaryOp::Add, other)
    }

    /// `self - other`
    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.binary(BinaryOp::Sub, other)
    }

    /// `self * other`
    pub fn mult(&self, other: &Self) -> Result<Self> {
        self.binary(BinaryOp::Mult, other)
    }

    /// `self + value`
    pub fn add_scalar(&self, value: f64) -> Result<Self> {
        self.scalar(ScalarOp::Add(value))
    }

    /// `self * value`
    pub fn mult_scalar(&self, value: f64) -> Result<Self> {
        self.scalar(ScalarOp::Mult(value))
    }

    /// `self + factor1 * factor2`, fused where the representation allows it.
    pub fn add_product(&self, factor1: &Self, factor2: &Self) -> Result<Self> {
        use RandomVariable::*;
        match (self, factor1, factor2) {
            (Double(a), Double(b), Double(c)) => Ok(Double(a.add_product(b, c)?)),
            (Float(a), Float(b), Float(c)) => Ok(Float(a.add_product(b, c)?)),
            (Lazy(a), Lazy(b), Lazy(c)) => Ok(Lazy(a.add_product(b, c))),
            (Differentiable(a), Differentiable(b), Differentiable(c)) => {
                Ok(Differentiable(a.add_product(b, c)?))
            }
            _ => {
                let odd = if factor1.kind_name() != self.kind_name() {
                    factor1
                } else {
                    factor2
                };
                Err(mismatch(self, odd))
            }
        }
    }

    /// `self + factor * scale`, fused where the representation allows it.
    pub fn add_product_scalar(&self, factor: &Self, scale: f64) -> Result<Self> {
        use RandomVariable::*;
        match (self, factor) {
            (Double(a), Double(b)) => Ok(Double(a.add_product_scalar(b, scale)?)),
            (Float(a), Float(b)) => Ok(Float(a.add_product_scalar(b, crate::ops::cast(scale))?)),
            (Lazy(a), Lazy(b)) => Ok(Lazy(a.add_product_scalar(b, scale))),
            (Differentiable(a), Differentiable(b)) => Ok(Differentiable(a.add_product_scalar(b, scale)?)),
            (a, b) => Err(mismatch(a, b)),
        }
    }

    fn binary(&self, op: BinaryOp, other: &Self) -> Result<Self> {
        use RandomVariable::*;
        match (self, other) {
            (Double(a), Double(b)) => Ok(Double(op.apply(a, b)?)),
            (Float(a), Float(b)) => Ok(Float(op.apply(a, b)?)),
            (Lazy(a), Lazy(b)) => Ok(Lazy(a.binary(op, b))),
            (Differentiable(a), Differentiable(b)) => Ok(Differentiable(a.binary(op, b)?)),
            (a, b) => Err(mismatch(a, b)),
        }
    }

    fn scalar(&self, op: ScalarOp) -> Result<Self> {
        Ok(match self {
            RandomVariable::Double(a) => RandomVariable::Double(op.apply(a)),
            RandomVariable::Float(a) => RandomVariable::Float(op.apply(a)),
            RandomVariable::Lazy(a) => RandomVariable::Lazy(a.scalar(op)),
            RandomVariable::Differentiable(a) => RandomVariable::Differentiable(a.scalar(op)?),
        })
    }

    /// Operation recorded for this value on its tape, if differentiable and
    /// the tape has not been reset since.
    pub fn recorded_operation(&self) -> Option<Operation> {
        let variable = self.as_differentiable().filter(|v| v.is_current())?;
        variable.tape().node(variable.id()).ok().map(|node| node.operation())
    }
}

fn mismatch(left: &RandomVariable, right: &RandomVariable) -> SimulationError {
    SimulationError::PayloadMismatch {
        left: left.kind_name(),
        right: right.kind_name(),
    }
}
