//! Lazily evaluated random variables.
//!
//! A [`LazyRandomVariable`] records an operation tree instead of computing
//! path values. The tree is evaluated the first time paths are read and the
//! result is memoised, so shared sub-expressions are evaluated once.
//!
//! Evaluation and drop walk the tree with an explicit stack, so chains of
//! one operation per time step stay within the thread stack however long
//! the time grid is.

use std::fmt;
use std::mem;
use std::sync::{Arc, OnceLock};

use stochastic_core::{PathValues, Result, SimulationError};

use crate::ops::{BinaryOp, ScalarOp};

enum Expr {
    Value(PathValues<f64>),
    Binary(BinaryOp, LazyRandomVariable, LazyRandomVariable),
    Scalar(ScalarOp, LazyRandomVariable),
    AddProduct(LazyRandomVariable, LazyRandomVariable, LazyRandomVariable),
    AddProductScalar(LazyRandomVariable, LazyRandomVariable, f64),
}

impl Expr {
    fn operands(&self) -> Vec<&LazyRandomVariable> {
        match self {
            Expr::Value(_) => Vec::new(),
            Expr::Scalar(_, a) => vec![a],
            Expr::Binary(_, a, b) | Expr::AddProductScalar(a, b, _) => vec![a, b],
            Expr::AddProduct(a, b, c) => vec![a, b, c],
        }
    }

    fn into_operands(self) -> Vec<LazyRandomVariable> {
        match self {
            Expr::Value(_) => Vec::new(),
            Expr::Scalar(_, a) => vec![a],
            Expr::Binary(_, a, b) | Expr::AddProductScalar(a, b, _) => vec![a, b],
            Expr::AddProduct(a, b, c) => vec![a, b, c],
        }
    }
}

struct Node {
    expr: Expr,
    time: f64,
    value: OnceLock<Result<PathValues<f64>>>,
}

impl Node {
    /// Apply the operation; every operand must already be evaluated.
    fn compute(&self) -> Result<PathValues<f64>> {
        match &self.expr {
            Expr::Value(values) => Ok(values.clone()),
            Expr::Binary(op, a, b) => op.apply(&a.cached()?, &b.cached()?),
            Expr::Scalar(op, a) => Ok(op.apply(&a.cached()?)),
            Expr::AddProduct(a, b, c) => a.cached()?.add_product(&b.cached()?, &c.cached()?),
            Expr::AddProductScalar(a, b, s) => a.cached()?.add_product_scalar(&b.cached()?, *s),
        }
    }

    fn take_operands(&mut self) -> Vec<LazyRandomVariable> {
        mem::replace(&mut self.expr, Expr::Value(PathValues::constant(0.0))).into_operands()
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        // Unlink uniquely owned operands here instead of letting each drop recurse.
        let mut pending = self.take_operands();
        while let Some(operand) = pending.pop() {
            if let Ok(mut node) = Arc::try_unwrap(operand.node) {
                pending.append(&mut node.take_operands());
            }
        }
    }
}

/// Deferred operation tree over `f64` path values.
///
/// # Examples
///
/// ```
/// use stochastic_aad::LazyRandomVariable;
/// use stochastic_core::PathValues;
///
/// let x = LazyRandomVariable::from_values(PathValues::from_paths(0.0, vec![1.0, 2.0]).unwrap());
/// let y = x.mult_scalar(3.0).add(&x);
/// assert!(!y.is_materialised());
///
/// assert_eq!(y.evaluate().unwrap().to_f64_vec(), vec![4.0, 8.0]);
/// assert!(y.is_materialised());
/// ```
#[derive(Clone)]
pub struct LazyRandomVariable {
    node: Arc<Node>,
}

impl LazyRandomVariable {
    /// Leaf holding already materialised values.
    pub fn from_values(values: PathValues<f64>) -> Self {
        let time = values.filtration_time();
        let value = OnceLock::new();
        let _ = value.set(Ok(values.clone()));
        Self::with_expr(Expr::Value(values), time, value)
    }

    fn with_expr(expr: Expr, time: f64, value: OnceLock<Result<PathValues<f64>>>) -> Self {
        Self {
            node: Arc::new(Node { expr, time, value }),
        }
    }

    fn deferred(expr: Expr, time: f64) -> Self {
        Self::with_expr(expr, time, OnceLock::new())
    }

    /// Filtration time, known without evaluation.
    pub fn filtration_time(&self) -> f64 {
        self.node.time
    }

    /// `true` once the values have been computed.
    pub fn is_materialised(&self) -> bool {
        self.node.value.get().is_some()
    }

    /// Evaluate the tree (once) and return the path values.
    ///
    /// # Errors
    ///
    /// Shape errors of any operation in the tree surface here.
    pub fn evaluate(&self) -> Result<PathValues<f64>> {
        // Post-order walk: a node is computed once all its operands are.
        let mut stack = vec![(Arc::clone(&self.node), false)];
        while let Some((node, operands_ready)) = stack.pop() {
            if node.value.get().is_some() {
                continue;
            }
            if operands_ready {
                node.value.get_or_init(|| node.compute());
                continue;
            }
            let pending: Vec<Arc<Node>> = node
                .expr
                .operands()
                .into_iter()
                .filter(|operand| !operand.is_materialised())
                .map(|operand| Arc::clone(&operand.node))
                .collect();
            stack.push((node, true));
            stack.extend(pending.into_iter().map(|operand| (operand, false)));
        }
        self.cached()
    }

    fn cached(&self) -> Result<PathValues<f64>> {
        match self.node.value.get() {
            Some(result) => result.clone(),
            None => Err(SimulationError::GraphInvariant(
                "lazy operand read before evaluation".to_string(),
            )),
        }
    }

    pub(crate) fn binary(&self, op: BinaryOp, other: &Self) -> Self {
        let time = self.filtration_time().max(other.filtration_time());
        Self::deferred(Expr::Binary(op, self.clone(), other.clone()), time)
    }

    pub(crate) fn scalar(&self, op: ScalarOp) -> Self {
        Self::deferred(Expr::Scalar(op, self.clone()), self.filtration_time())
    }

    /// `self + other`
    pub fn add(&self, other: &Self) -> Self {
        self.binary(BinaryOp::Add, other)
    }

    /// `self - other`
    pub fn sub(&self, other: &Self) -> Self {
        self.binary(BinaryOp::Sub, other)
    }

    /// `self * other`
    pub fn mult(&self, other: &Self) -> Self {
        self.binary(BinaryOp::Mult, other)
    }

    /// `self + value`
    pub fn add_scalar(&self, value: f64) -> Self {
        self.scalar(ScalarOp::Add(value))
    }

    /// `self * value`
    pub fn mult_scalar(&self, value: f64) -> Self {
        self.scalar(ScalarOp::Mult(value))
    }

    /// `self + factor1 * factor2`
    pub fn add_product(&self, factor1: &Self, factor2: &Self) -> Self {
        let time = self
            .filtration_time()
            .max(factor1.filtration_time())
            .max(factor2.filtration_time());
        let expr = Expr::AddProduct(self.clone(), factor1.clone(), factor2.clone());
        Self::deferred(expr, time)
    }

    /// `self + factor * scale`
    pub fn add_product_scalar(&self, factor: &Self, scale: f64) -> Self {
        let time = self.filtration_time().max(factor.filtration_time());
        Self::deferred(Expr::AddProductScalar(self.clone(), factor.clone(), scale), time)
    }
}

impl fmt::Debug for LazyRandomVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyRandomVariable")
            .field("time", &self.node.time)
            .field("materialised", &self.is_materialised())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stochastic_core::SimulationError;

    fn leaf(values: &[f64]) -> LazyRandomVariable {
        LazyRandomVariable::from_values(PathValues::from_paths(1.0, values.to_vec()).unwrap())
    }

    #[test]
    fn test_deferred_until_read() {
        let x = leaf(&[1.0, 2.0, 3.0]);
        let y = x.add_product_scalar(&x, 2.0).sub(&x.add_scalar(1.0));
        assert!(!y.is_materialised());
        assert_eq!(y.filtration_time(), 1.0);
        assert_eq!(y.evaluate().unwrap().to_f64_vec(), vec![1.0, 3.0, 5.0]);
        assert!(y.is_materialised());
    }

    #[test]
    fn test_errors_surface_on_evaluation() {
        let x = leaf(&[1.0, 2.0]);
        let y = leaf(&[1.0, 2.0, 3.0]);
        let z = x.mult(&y);
        assert!(matches!(z.evaluate(), Err(SimulationError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_long_chain_evaluates_and_drops() {
        // Longer than any admissible time grid, with one operation per step.
        let start = leaf(&[0.0, 1.0]);
        let mut x = start.clone();
        for _ in 0..50_000 {
            x = x.add_scalar(1.0).add_product_scalar(&start, 0.0);
        }
        assert!(!x.is_materialised());
        assert_eq!(x.evaluate().unwrap().to_f64_vec(), vec![50_000.0, 50_001.0]);
        drop(start);
        drop(x);
    }

    #[test]
    fn test_shared_subexpressions_evaluated_once() {
        let x = leaf(&[1.0, 2.0]);
        let mut y = x.clone();
        for _ in 0..64 {
            y = y.add(&y);
        }
        let expected = 2.0_f64.powi(64);
        assert_eq!(y.evaluate().unwrap().to_f64_vec(), vec![expected, 2.0 * expected]);
    }

    #[test]
    fn test_add_product_matches_eager() {
        let a = PathValues::from_paths(0.0, vec![0.1, 0.2]).unwrap();
        let b = PathValues::from_paths(0.0, vec![3.0, -1.0]).unwrap();
        let c = PathValues::constant(0.7);
        let eager = a.add_product(&b, &c).unwrap();
        let lazy = LazyRandomVariable::from_values(a)
            .add_product(&LazyRandomVariable::from_values(b), &LazyRandomVariable::from_values(c));
        assert_eq!(lazy.evaluate().unwrap(), eager);
    }
}
