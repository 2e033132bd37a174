//! Differentiable random variables recorded on a [`Tape`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use stochastic_core::{PathValues, Result, SimulationError};

use crate::ops::{BinaryOp, ScalarOp};
use crate::tape::{NodeHandle, Operation, Tape};

/// Differentiable value: eager path values plus a node on a session tape.
///
/// Every operation computes its result immediately and appends one node
/// whose parents are the operands. The result is constant only if all
/// operands are constant. Operands must live on the same tape and must have
/// been recorded since its last reset.
///
/// # Examples
///
/// ```
/// use stochastic_aad::{AadVariable, Tape};
/// use stochastic_core::PathValues;
///
/// let tape = Tape::shared();
/// let x = AadVariable::leaf(&tape, PathValues::constant(3.0), false).unwrap();
/// let y = x.mult(&x).unwrap(); // x^2
///
/// let gradient = y.gradient().unwrap();
/// assert_eq!(gradient[&x.id()].scalar_value(), Some(6.0));
/// ```
#[derive(Clone)]
pub struct AadVariable {
    tape: Arc<Tape>,
    handle: NodeHandle,
    value: PathValues<f64>,
}

impl AadVariable {
    /// Record a source node on `tape`.
    pub fn leaf(tape: &Arc<Tape>, value: PathValues<f64>, is_constant: bool) -> Result<Self> {
        let handle = tape.record(value.clone(), is_constant, &[], Operation::Leaf)?;
        Ok(Self {
            tape: Arc::clone(tape),
            handle,
            value,
        })
    }

    /// Id of the node on the tape.
    #[inline]
    pub fn id(&self) -> usize {
        self.handle.id()
    }

    /// Whether the node is constant.
    #[inline]
    pub fn is_constant(&self) -> bool {
        self.handle.is_constant()
    }

    /// Handle of the recorded node.
    #[inline]
    pub fn handle(&self) -> &NodeHandle {
        &self.handle
    }

    /// Path values.
    #[inline]
    pub fn value(&self) -> &PathValues<f64> {
        &self.value
    }

    /// Tape the value is recorded on.
    #[inline]
    pub fn tape(&self) -> &Arc<Tape> {
        &self.tape
    }

    /// Derivatives of this value with respect to the independent variables.
    ///
    /// Fails with `GraphInvariant` once the tape has been reset.
    pub fn gradient(&self) -> Result<BTreeMap<usize, PathValues<f64>>> {
        self.tape.gradient_of(&self.handle)
    }

    /// `true` while the tape has not been reset since this value was recorded.
    pub fn is_current(&self) -> bool {
        self.tape.is_current(&self.handle)
    }

    fn derive(&self, operands: &[&Self], value: PathValues<f64>, operation: Operation) -> Result<Self> {
        if let Some(foreign) = operands.iter().find(|o| !Arc::ptr_eq(&o.tape, &self.tape)) {
            return Err(SimulationError::GraphInvariant(format!(
                "node {} and node {} are recorded on different tapes",
                self.id(),
                foreign.id()
            )));
        }
        let is_constant = self.is_constant() && operands.iter().all(|o| o.is_constant());
        let parents: Vec<&NodeHandle> = std::iter::once(&self.handle)
            .chain(operands.iter().map(|o| &o.handle))
            .collect();
        let handle = self
            .tape
            .record_derived(value.clone(), is_constant, &parents, operation)?;
        Ok(Self {
            tape: Arc::clone(&self.tape),
            handle,
            value,
        })
    }

    pub(crate) fn binary(&self, op: BinaryOp, other: &Self) -> Result<Self> {
        let value = op.apply(&self.value, &other.value)?;
        self.derive(&[other], value, op.operation())
    }

    pub(crate) fn scalar(&self, op: ScalarOp) -> Result<Self> {
        let value = op.apply(&self.value);
        self.derive(&[], value, op.operation())
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

    /// `self + factor1 * factor2`
    pub fn add_product(&self, factor1: &Self, factor2: &Self) -> Result<Self> {
        let value = self.value.add_product(&factor1.value, &factor2.value)?;
        self.derive(&[factor1, factor2], value, Operation::AddProduct)
    }

    /// `self + factor * scale`
    pub fn add_product_scalar(&self, factor: &Self, scale: f64) -> Result<Self> {
        let value = self.value.add_product_scalar(&factor.value, scale)?;
        self.derive(&[factor], value, Operation::AddProductScalar(scale))
    }
}

impl fmt::Debug for AadVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AadVariable")
            .field("id", &self.id())
            .field("is_constant", &self.is_constant())
            .field("parents", &self.handle.parent_ids())
            .field("value", &self.value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn variable(tape: &Arc<Tape>, values: &[f64]) -> AadVariable {
        AadVariable::leaf(tape, PathValues::from_paths(0.0, values.to_vec()).unwrap(), false).unwrap()
    }

    #[test]
    fn test_operations_append_nodes_with_parents() {
        let tape = Tape::shared();
        let x = variable(&tape, &[1.0, 2.0]);
        let y = variable(&tape, &[3.0, 4.0]);
        let z = x.add(&y).unwrap();

        assert_eq!(z.id(), 2);
        assert_eq!(z.handle().parent_ids(), &[0, 1]);
        assert!(!z.is_constant());
        assert_eq!(z.value().to_f64_vec(), vec![4.0, 6.0]);
        assert_eq!(tape.number_of_variables_in_list(), 2);
    }

    #[test]
    fn test_constant_propagation() {
        let tape = Tape::shared();
        let a = AadVariable::leaf(&tape, PathValues::constant(2.0), true).unwrap();
        let b = AadVariable::leaf(&tape, PathValues::constant(3.0), true).unwrap();
        let x = variable(&tape, &[1.0]);
        assert!(a.mult(&b).unwrap().is_constant());
        assert!(!a.mult(&x).unwrap().is_constant());
    }

    #[test]
    fn test_rejects_foreign_tape() {
        let x = variable(&Tape::shared(), &[1.0]);
        let y = variable(&Tape::shared(), &[1.0]);
        assert!(matches!(x.add(&y), Err(SimulationError::GraphInvariant(_))));
    }

    #[test]
    fn test_values_from_before_reset_are_rejected() {
        let tape = Tape::shared();
        let stale = variable(&tape, &[0.5, -0.5]);
        tape.reset();
        let sigma = AadVariable::leaf(&tape, PathValues::constant(0.2), false).unwrap();
        assert_eq!(sigma.id(), stale.id());

        assert!(!stale.is_current());
        assert!(matches!(sigma.mult(&stale), Err(SimulationError::GraphInvariant(_))));
        assert!(matches!(stale.add_scalar(1.0), Err(SimulationError::GraphInvariant(_))));
        assert!(matches!(stale.gradient(), Err(SimulationError::GraphInvariant(_))));
        assert_eq!(tape.len(), 1);
    }

    #[test]
    fn test_gradient_of_correlated_sum() {
        // z = 0 + 0.5 * w0 + 0.8 * w1 with constant zero accumulator
        let tape = Tape::shared();
        let zero = AadVariable::leaf(&tape, PathValues::constant(0.0), true).unwrap();
        let w0 = variable(&tape, &[1.0, -1.0]);
        let w1 = variable(&tape, &[0.5, 0.25]);
        let z = zero
            .add_product_scalar(&w0, 0.5)
            .unwrap()
            .add_product_scalar(&w1, 0.8)
            .unwrap();

        let gradient = z.gradient().unwrap();
        assert_eq!(gradient.keys().copied().collect::<Vec<_>>(), vec![w0.id(), w1.id()]);
        assert_relative_eq!(gradient[&w0.id()].scalar_value().unwrap(), 0.5);
        assert_relative_eq!(gradient[&w1.id()].scalar_value().unwrap(), 0.8);
    }

    #[test]
    fn test_gradient_of_sub_and_product() {
        // f = x - x * y  => df/dx = 1 - y, df/dy = -x
        let tape = Tape::shared();
        let x = variable(&tape, &[2.0]);
        let y = variable(&tape, &[5.0]);
        let f = x.sub(&x.mult(&y).unwrap()).unwrap();
        let gradient = f.gradient().unwrap();
        assert_eq!(gradient[&x.id()].to_f64_vec(), vec![-4.0]);
        assert_eq!(gradient[&y.id()].to_f64_vec(), vec![-2.0]);
    }
}
