//! # Adjoint Differentiation Tape
//!
//! A [`Tape`] is the append-only log of computation-graph nodes of one
//! differentiation session. Every differentiable value created or computed in
//! the session appends one [`TapeNode`] holding its payload, its constancy
//! flag, the ids of the nodes it was computed from and the elementary
//! [`Operation`] that produced it.
//!
//! ## Invariants
//!
//! - Ids are dense, start at 0 and are assigned exactly once.
//! - Every parent id is strictly smaller than the id of its child, so id order
//!   is a topological order for forward re-evaluation and backward sweeps.
//! - Nodes are immutable once appended; the tape only grows until [`Tape::reset`].
//! - Every reset starts a new generation. Handles remember the generation
//!   they were recorded in, and a node derived from a handle of an older
//!   generation is rejected, since its id may now name an unrelated node.
//!
//! ## Session Lifecycle
//!
//! ```text
//! Empty --record--> Recording --record--> Recording
//!   ^                   |
//!   +------reset--------+
//! ```
//!
//! The tape is an explicit session object owned by the caller and shared as
//! `Arc<Tape>`; independent simulations use independent tapes.
//!
//! ## Concurrency
//!
//! Id assignment, parent validation and append happen inside one critical
//! section. Concurrent creators never receive the same id and no node is
//! visible before it is complete. Payload arithmetic happens outside the lock.
//!
//! ## Usage
//!
//! ```rust
//! use stochastic_aad::{Operation, Tape};
//! use stochastic_core::PathValues;
//!
//! let tape = Tape::new();
//! let x = tape.create_leaf(0.0, 2.0, false).unwrap();
//! let y = tape.create_leaf(0.0, 5.0, false).unwrap();
//! let product = tape
//!     .record(PathValues::constant(10.0), false, &[x.id(), y.id()], Operation::Mult)
//!     .unwrap();
//!
//! assert_eq!(tape.len(), 3);
//! assert_eq!(tape.ids_of_variables_in_list(), vec![0, 1]);
//!
//! let gradient = tape.gradient(product.id()).unwrap();
//! assert_eq!(gradient[&x.id()].scalar_value(), Some(5.0));
//! assert_eq!(gradient[&y.id()].scalar_value(), Some(2.0));
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use stochastic_core::{check_index, PathValues, Result, SimulationError};
use tracing::{debug, trace, warn};

/// Elementary operation that produced a node.
///
/// Parent order matters: for `Sub` the node is `parents[0] - parents[1]`,
/// for `AddProduct` it is `parents[0] + parents[1] * parents[2]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operation {
    /// Source node without parents.
    Leaf,
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mult,
    /// `a + c`
    AddScalar(f64),
    /// `a * c`
    MultScalar(f64),
    /// `a + b * c`
    AddProduct,
    /// `a + b * c` with a constant `c`
    AddProductScalar(f64),
    /// Node with parents but no recorded partial derivatives.
    Opaque,
}

impl Operation {
    /// Number of parents the operation takes, `None` for any positive number.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Operation::Leaf => Some(0),
            Operation::AddScalar(_) | Operation::MultScalar(_) => Some(1),
            Operation::Add | Operation::Sub | Operation::Mult | Operation::AddProductScalar(_) => {
                Some(2)
            }
            Operation::AddProduct => Some(3),
            Operation::Opaque => None,
        }
    }
}

/// Recording state of a tape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapeState {
    /// No node has been recorded since creation or the last reset.
    Empty,
    /// At least one node has been recorded.
    Recording,
}

/// A node of the computation graph.
#[derive(Clone, Debug, PartialEq)]
pub struct TapeNode {
    id: usize,
    payload: PathValues<f64>,
    is_constant: bool,
    parent_ids: Arc<[usize]>,
    operation: Operation,
}

impl TapeNode {
    /// Id of the node.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Numeric value at creation time.
    #[inline]
    pub fn payload(&self) -> &PathValues<f64> {
        &self.payload
    }

    /// Whether the node was recorded as a constant.
    #[inline]
    pub fn is_constant(&self) -> bool {
        self.is_constant
    }

    /// Ids of the nodes this node was computed from.
    #[inline]
    pub fn parent_ids(&self) -> &[usize] {
        &self.parent_ids
    }

    /// Operation that produced the node.
    #[inline]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// `true` for true independent variables: not constant and without parents.
    #[inline]
    pub fn is_independent_variable(&self) -> bool {
        !self.is_constant && self.parent_ids.is_empty()
    }
}

/// Lightweight reference to a recorded node.
///
/// Carries the id, constancy, parent ids and tape generation so that
/// arithmetic can thread dependency edges without touching the tape or
/// copying payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeHandle {
    id: usize,
    is_constant: bool,
    parent_ids: Arc<[usize]>,
    generation: u64,
}

impl NodeHandle {
    /// Id of the node.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Whether the node was recorded as a constant.
    #[inline]
    pub fn is_constant(&self) -> bool {
        self.is_constant
    }

    /// Ids of the parents of the node.
    #[inline]
    pub fn parent_ids(&self) -> &[usize] {
        &self.parent_ids
    }

    /// Tape generation the node was recorded in.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
struct Session {
    generation: u64,
    nodes: Vec<TapeNode>,
}

impl Session {
    fn check_current(&self, handle: &NodeHandle) -> Result<()> {
        if handle.generation == self.generation {
            return Ok(());
        }
        warn!(
            id = handle.id,
            recorded = handle.generation,
            current = self.generation,
            "rejected node recorded before a reset"
        );
        Err(SimulationError::GraphInvariant(format!(
            "node {} belongs to tape generation {}, the tape was reset to generation {}",
            handle.id, handle.generation, self.generation
        )))
    }

    fn append(
        &mut self,
        payload: PathValues<f64>,
        is_constant: bool,
        parent_ids: &[usize],
        operation: Operation,
    ) -> Result<NodeHandle> {
        let id = self.nodes.len();
        if let Some(&parent) = parent_ids.iter().find(|&&parent| parent >= id) {
            warn!(id, parent, "rejected node referencing a non-preceding parent");
            return Err(SimulationError::GraphInvariant(format!(
                "parent id {} is not smaller than new node id {}",
                parent, id
            )));
        }

        let parent_ids: Arc<[usize]> = parent_ids.into();
        self.nodes.push(TapeNode {
            id,
            payload,
            is_constant,
            parent_ids: Arc::clone(&parent_ids),
            operation,
        });
        trace!(id, parents = parent_ids.len(), is_constant, "recorded tape node");

        Ok(NodeHandle {
            id,
            is_constant,
            parent_ids,
            generation: self.generation,
        })
    }
}

/// Append-only computation graph of one differentiation session.
#[derive(Debug, Default)]
pub struct Tape {
    session: Mutex<Session>,
}

impl Tape {
    /// Create an empty tape.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty tape ready to be shared between factories.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // Nodes are immutable once pushed, so a panic while holding the lock
    // cannot leave a half-written node behind.
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a node and return its handle.
    ///
    /// # Errors
    ///
    /// Returns `GraphInvariant` if a parent id is not strictly smaller than
    /// the id the node would receive, or if the number of parents does not
    /// match the arity of `operation`. Nothing is appended in that case.
    pub fn record(
        &self,
        payload: PathValues<f64>,
        is_constant: bool,
        parent_ids: &[usize],
        operation: Operation,
    ) -> Result<NodeHandle> {
        check_arity(operation, parent_ids.len())?;
        self.lock().append(payload, is_constant, parent_ids, operation)
    }

    /// Append a node computed from previously recorded nodes.
    ///
    /// Unlike [`Tape::record`], parents are given as handles, so a parent
    /// recorded before the last [`Tape::reset`] is detected instead of being
    /// confused with the node that now carries its id.
    ///
    /// # Errors
    ///
    /// `GraphInvariant` if a parent belongs to an older generation, plus the
    /// errors of [`Tape::record`].
    pub fn record_derived(
        &self,
        payload: PathValues<f64>,
        is_constant: bool,
        parents: &[&NodeHandle],
        operation: Operation,
    ) -> Result<NodeHandle> {
        check_arity(operation, parents.len())?;
        let parent_ids: Vec<usize> = parents.iter().map(|parent| parent.id).collect();
        let mut session = self.lock();
        for parent in parents {
            session.check_current(parent)?;
        }
        session.append(payload, is_constant, &parent_ids, operation)
    }

    /// Register a value with explicit constancy and parents.
    ///
    /// Nodes without parents are recorded as [`Operation::Leaf`], nodes with
    /// parents as [`Operation::Opaque`].
    pub fn create_random_variable(
        &self,
        payload: PathValues<f64>,
        is_constant: bool,
        parent_ids: &[usize],
    ) -> Result<NodeHandle> {
        let operation = if parent_ids.is_empty() {
            Operation::Leaf
        } else {
            Operation::Opaque
        };
        self.record(payload, is_constant, parent_ids, operation)
    }

    /// Register a deterministic source node.
    pub fn create_leaf(&self, time: f64, value: f64, is_constant: bool) -> Result<NodeHandle> {
        self.record(PathValues::scalar(time, value), is_constant, &[], Operation::Leaf)
    }

    /// Register a path-wise source node.
    pub fn create_leaf_from_paths(
        &self,
        time: f64,
        values: Vec<f64>,
        is_constant: bool,
    ) -> Result<NodeHandle> {
        let payload = PathValues::from_paths(time, values)?;
        self.record(payload, is_constant, &[], Operation::Leaf)
    }

    /// Number of recorded nodes.
    pub fn len(&self) -> usize {
        self.lock().nodes.len()
    }

    /// `true` if no node is recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().nodes.is_empty()
    }

    /// Current generation, incremented by every [`Tape::reset`].
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// `true` if `handle` was recorded since the last reset.
    pub fn is_current(&self, handle: &NodeHandle) -> bool {
        self.lock().generation == handle.generation
    }

    /// Current recording state.
    pub fn state(&self) -> TapeState {
        if self.is_empty() {
            TapeState::Empty
        } else {
            TapeState::Recording
        }
    }

    /// Node with the given id.
    pub fn node(&self, id: usize) -> Result<TapeNode> {
        let session = self.lock();
        check_index("node", id, session.nodes.len())?;
        Ok(session.nodes[id].clone())
    }

    /// Snapshot of all nodes in creation order.
    pub fn list_of_all_variables(&self) -> Vec<TapeNode> {
        self.lock().nodes.clone()
    }

    /// Number of independent variables (not constant, no parents).
    pub fn number_of_variables_in_list(&self) -> usize {
        self.lock()
            .nodes
            .iter()
            .filter(|node| node.is_independent_variable())
            .count()
    }

    /// Ids of the independent variables in creation order.
    pub fn ids_of_variables_in_list(&self) -> Vec<usize> {
        self.lock()
            .nodes
            .iter()
            .filter(|node| node.is_independent_variable())
            .map(TapeNode::id)
            .collect()
    }

    /// Discard every node, start a new generation and return to
    /// [`TapeState::Empty`].
    ///
    /// Handles obtained before the reset keep their old generation; deriving
    /// from them through [`Tape::record_derived`] or differentiating them
    /// with [`Tape::gradient_of`] fails.
    pub fn reset(&self) {
        let mut session = self.lock();
        let discarded = session.nodes.len();
        session.nodes.clear();
        session.generation += 1;
        debug!(discarded, generation = session.generation, "tape reset");
    }

    /// Reverse sweep from `output`.
    ///
    /// Seeds the adjoint of `output` with one and propagates adjoints to
    /// parents in descending id order. Constant nodes stop propagation.
    ///
    /// # Returns
    ///
    /// The path-wise derivative of `output` with respect to every independent
    /// variable it depends on, keyed by id.
    ///
    /// # Errors
    ///
    /// - `IndexOutOfRange` if `output` is not on the tape
    /// - `GraphInvariant` if an `Opaque` node lies on a differentiated path
    pub fn gradient(&self, output: usize) -> Result<BTreeMap<usize, PathValues<f64>>> {
        let nodes = {
            let session = self.lock();
            check_index("node", output, session.nodes.len())?;
            session.nodes[..=output].to_vec()
        };
        sweep(&nodes, output)
    }

    /// Reverse sweep from the node behind `output`.
    ///
    /// # Errors
    ///
    /// `GraphInvariant` if `output` was recorded before the last reset, plus
    /// the errors of [`Tape::gradient`].
    pub fn gradient_of(&self, output: &NodeHandle) -> Result<BTreeMap<usize, PathValues<f64>>> {
        let nodes = {
            let session = self.lock();
            session.check_current(output)?;
            check_index("node", output.id, session.nodes.len())?;
            session.nodes[..=output.id].to_vec()
        };
        sweep(&nodes, output.id)
    }
}

fn check_arity(operation: Operation, parents: usize) -> Result<()> {
    let arity_ok = match operation.arity() {
        Some(n) => parents == n,
        None => parents > 0,
    };
    if arity_ok {
        return Ok(());
    }
    warn!(?operation, parents, "rejected node with wrong arity");
    Err(SimulationError::GraphInvariant(format!(
        "{:?} cannot take {} parents",
        operation, parents
    )))
}

/// Backward pass over `nodes[..=output]`.
fn sweep(nodes: &[TapeNode], output: usize) -> Result<BTreeMap<usize, PathValues<f64>>> {
    let mut adjoints: Vec<Option<PathValues<f64>>> = vec![None; output + 1];
    adjoints[output] = Some(PathValues::constant(1.0));
    let mut gradient = BTreeMap::new();

    for id in (0..=output).rev() {
        let Some(adjoint) = adjoints[id].take() else {
            continue;
        };
        let node = &nodes[id];
        if node.is_independent_variable() {
            gradient.insert(id, adjoint);
            continue;
        }
        if node.is_constant {
            continue;
        }
        for (parent, contribution) in partial_adjoints(node, &adjoint, nodes)? {
            if nodes[parent].is_constant {
                continue;
            }
            adjoints[parent] = Some(match adjoints[parent].take() {
                Some(existing) => existing.add(&contribution)?,
                None => contribution,
            });
        }
    }

    debug!(output, variables = gradient.len(), "completed reverse sweep");
    Ok(gradient)
}

/// Adjoint contributions of `node` to each of its parents.
fn partial_adjoints(
    node: &TapeNode,
    adjoint: &PathValues<f64>,
    nodes: &[TapeNode],
) -> Result<Vec<(usize, PathValues<f64>)>> {
    let p = node.parent_ids();
    let value = |i: usize| nodes[p[i]].payload();
    let contributions = match node.operation {
        Operation::Leaf => Vec::new(),
        Operation::Add => vec![(p[0], adjoint.clone()), (p[1], adjoint.clone())],
        Operation::Sub => vec![(p[0], adjoint.clone()), (p[1], adjoint.mult_scalar(-1.0))],
        Operation::Mult => vec![(p[0], adjoint.mult(value(1))?), (p[1], adjoint.mult(value(0))?)],
        Operation::AddScalar(_) => vec![(p[0], adjoint.clone())],
        Operation::MultScalar(c) => vec![(p[0], adjoint.mult_scalar(c))],
        Operation::AddProduct => vec![
            (p[0], adjoint.clone()),
            (p[1], adjoint.mult(value(2))?),
            (p[2], adjoint.mult(value(1))?),
        ],
        Operation::AddProductScalar(c) => {
            vec![(p[0], adjoint.clone()), (p[1], adjoint.mult_scalar(c))]
        }
        Operation::Opaque => {
            return Err(SimulationError::GraphInvariant(format!(
                "node {} carries no derivative information",
                node.id
            )))
        }
    };
    Ok(contributions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ids_are_dense() {
        let tape = Tape::new();
        assert_eq!(tape.state(), TapeState::Empty);
        for expected in 0..5 {
            let handle = tape.create_leaf(0.0, expected as f64, false).unwrap();
            assert_eq!(handle.id(), expected);
        }
        assert_eq!(tape.state(), TapeState::Recording);
        assert_eq!(tape.len(), 5);
    }

    #[test]
    fn test_rejects_parent_not_smaller() {
        let tape = Tape::new();
        tape.create_leaf(0.0, 1.0, false).unwrap();
        let err = tape
            .create_random_variable(PathValues::constant(1.0), false, &[1])
            .unwrap_err();
        assert!(matches!(err, SimulationError::GraphInvariant(_)));
        assert!(err.is_fatal());
        // Nothing was appended
        assert_eq!(tape.len(), 1);
    }

    #[test]
    fn test_rejects_wrong_arity() {
        let tape = Tape::new();
        let a = tape.create_leaf(0.0, 1.0, false).unwrap();
        let result = tape.record(PathValues::constant(1.0), false, &[a.id()], Operation::Add);
        assert!(matches!(result, Err(SimulationError::GraphInvariant(_))));
        let result = tape.record(PathValues::constant(1.0), false, &[], Operation::Opaque);
        assert!(result.is_err());
    }

    #[test]
    fn test_node_out_of_range() {
        let tape = Tape::new();
        tape.create_leaf(0.0, 1.0, true).unwrap();
        assert!(tape.node(0).is_ok());
        assert!(matches!(
            tape.node(1),
            Err(SimulationError::IndexOutOfRange { what: "node", index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_independent_variable_counting() {
        let tape = Tape::new();
        let a = tape.create_leaf(0.0, 1.0, false).unwrap();
        tape.create_leaf(0.0, 2.0, true).unwrap();
        let c = tape.create_leaf_from_paths(0.0, vec![1.0, 2.0], false).unwrap();
        // Constant with parents: accepted, not a variable
        tape.create_random_variable(PathValues::constant(3.0), true, &[a.id()])
            .unwrap();
        // Derived variable: not independent
        tape.record(PathValues::constant(2.0), false, &[a.id(), c.id()], Operation::Add)
            .unwrap();

        assert_eq!(tape.number_of_variables_in_list(), 2);
        assert_eq!(tape.ids_of_variables_in_list(), vec![0, 2]);
    }

    #[test]
    fn test_reset_returns_to_empty() {
        let tape = Tape::new();
        tape.create_leaf(0.0, 1.0, false).unwrap();
        tape.reset();
        assert_eq!(tape.state(), TapeState::Empty);
        assert_eq!(tape.create_leaf(0.0, 1.0, false).unwrap().id(), 0);
    }

    #[test]
    fn test_gradient_of_sum_of_products() {
        // f = x * y + 3 * x  =>  df/dx = y + 3, df/dy = x
        let tape = Tape::new();
        let x = tape.create_leaf_from_paths(0.0, vec![1.0, 2.0], false).unwrap();
        let y = tape.create_leaf_from_paths(0.0, vec![4.0, 5.0], false).unwrap();
        let xy = tape
            .record(PathValues::constant(0.0), false, &[x.id(), y.id()], Operation::Mult)
            .unwrap();
        let f = tape
            .record(
                PathValues::constant(0.0),
                false,
                &[xy.id(), x.id()],
                Operation::AddProductScalar(3.0),
            )
            .unwrap();

        let gradient = tape.gradient(f.id()).unwrap();
        assert_eq!(gradient.len(), 2);
        assert_eq!(gradient[&x.id()].to_f64_vec(), vec![7.0, 8.0]);
        assert_eq!(gradient[&y.id()].to_f64_vec(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_gradient_stops_at_constants() {
        let tape = Tape::new();
        let x = tape.create_leaf(0.0, 2.0, false).unwrap();
        let frozen = tape
            .create_random_variable(PathValues::constant(2.0), true, &[x.id()])
            .unwrap();
        let y = tape
            .record(PathValues::constant(4.0), false, &[frozen.id()], Operation::MultScalar(2.0))
            .unwrap();
        assert!(tape.gradient(y.id()).unwrap().is_empty());
    }

    #[test]
    fn test_gradient_through_opaque_node_fails() {
        let tape = Tape::new();
        let x = tape.create_leaf(0.0, 2.0, false).unwrap();
        let y = tape
            .create_random_variable(PathValues::constant(4.0), false, &[x.id()])
            .unwrap();
        assert!(matches!(tape.gradient(y.id()), Err(SimulationError::GraphInvariant(_))));
    }

    #[test]
    fn test_reset_starts_new_generation() {
        let tape = Tape::new();
        let before = tape.create_leaf(0.0, 1.0, false).unwrap();
        assert_eq!(tape.generation(), 0);
        assert!(tape.is_current(&before));

        tape.reset();
        let after = tape.create_leaf(0.0, 2.0, false).unwrap();
        assert_eq!(tape.generation(), 1);
        assert_eq!(after.generation(), 1);
        assert_eq!(before.id(), after.id());
        assert!(!tape.is_current(&before));
        assert!(tape.is_current(&after));
    }

    #[test]
    fn test_derived_node_rejects_parent_from_before_reset() {
        let tape = Tape::new();
        let stale = tape.create_leaf(0.0, 1.0, false).unwrap();
        tape.reset();
        let fresh = tape.create_leaf(0.0, 2.0, false).unwrap();

        let result = tape.record_derived(
            PathValues::constant(2.0),
            false,
            &[&fresh, &stale],
            Operation::Mult,
        );
        assert!(matches!(result, Err(SimulationError::GraphInvariant(_))));
        assert_eq!(tape.len(), 1);

        let product = tape
            .record_derived(PathValues::constant(4.0), false, &[&fresh, &fresh], Operation::Mult)
            .unwrap();
        assert_eq!(product.parent_ids(), &[0, 0]);
    }

    #[test]
    fn test_gradient_of_stale_output_fails() {
        let tape = Tape::new();
        let x = tape.create_leaf(0.0, 2.0, false).unwrap();
        assert!(tape.gradient_of(&x).is_ok());
        tape.reset();
        tape.create_leaf(0.0, 3.0, false).unwrap();
        assert!(matches!(tape.gradient_of(&x), Err(SimulationError::GraphInvariant(_))));
    }

    #[test]
    fn test_gradient_of_leaf_is_one() {
        let tape = Tape::new();
        let x = tape.create_leaf(0.0, 2.0, false).unwrap();
        let gradient = tape.gradient(x.id()).unwrap();
        assert_relative_eq!(gradient[&0].scalar_value().unwrap(), 1.0);
    }
}
