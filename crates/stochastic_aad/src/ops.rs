//! Elementary binary operations shared by every payload kind.

use stochastic_core::{PathValues, Real, Result};

use crate::tape::Operation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mult,
}

impl BinaryOp {
    pub(crate) fn apply<T: Real>(self, a: &PathValues<T>, b: &PathValues<T>) -> Result<PathValues<T>> {
        match self {
            BinaryOp::Add => a.add(b),
            BinaryOp::Sub => a.sub(b),
            BinaryOp::Mult => a.mult(b),
        }
    }

    pub(crate) fn operation(self) -> Operation {
        match self {
            BinaryOp::Add => Operation::Add,
            BinaryOp::Sub => Operation::Sub,
            BinaryOp::Mult => Operation::Mult,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum ScalarOp {
    Add(f64),
    Mult(f64),
}

impl ScalarOp {
    pub(crate) fn apply<T: Real>(self, a: &PathValues<T>) -> PathValues<T> {
        match self {
            ScalarOp::Add(c) => a.add_scalar(cast(c)),
            ScalarOp::Mult(c) => a.mult_scalar(cast(c)),
        }
    }

    pub(crate) fn operation(self) -> Operation {
        match self {
            ScalarOp::Add(c) => Operation::AddScalar(c),
            ScalarOp::Mult(c) => Operation::MultScalar(c),
        }
    }
}

/// Convert an `f64` coefficient into the payload element type.
#[inline]
pub(crate) fn cast<T: Real>(value: f64) -> T {
    T::from(value).unwrap_or_else(T::nan)
}
