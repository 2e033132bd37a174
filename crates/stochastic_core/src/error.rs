//! Error types for structured error handling.
//!
//! This module provides [`SimulationError`], the single error taxonomy shared
//! by every layer of the workspace:
//! - `IndexOutOfRange`: caller asked for a time index, factor, path or node
//!   that does not exist
//! - `GraphInvariant`: recording would break the topological order of the tape
//! - `DimensionMismatch`: shapes of operands or matrices do not agree
//! - `InvalidParameter`: a construction parameter is outside its domain
//! - `PayloadMismatch`: two different payload kinds met in one expression
//! - `Calculation`: an upstream numeric failure, annotated with its location
//!
//! None of these are transient; callers should never retry.

use thiserror::Error;

/// Result alias used throughout the simulation crates.
pub type Result<T> = std::result::Result<T, SimulationError>;

/// Categorised simulation errors.
///
/// # Examples
/// ```
/// use stochastic_core::SimulationError;
///
/// let err = SimulationError::index_out_of_range("factor", 3, 2);
/// assert_eq!(format!("{}", err), "factor index 3 out of range [0, 2)");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Index outside `[0, len)`.
    #[error("{what} index {index} out of range [0, {len})")]
    IndexOutOfRange {
        /// What kind of index was requested (e.g. "time", "factor", "node")
        what: &'static str,
        /// The offending index
        index: usize,
        /// Number of valid entries
        len: usize,
    },

    /// Recording would violate the computation graph invariants.
    #[error("Graph invariant violation: {0}")]
    GraphInvariant(String),

    /// Shapes of two operands or of a matrix do not agree.
    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// What was being compared
        what: &'static str,
        /// Expected size
        expected: usize,
        /// Actual size
        got: usize,
    },

    /// Invalid construction parameter.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Description of the invalid value
        reason: String,
    },

    /// Values of different payload kinds were combined.
    #[error("Payload mismatch: cannot combine {left} with {right}")]
    PayloadMismatch {
        /// Payload kind of the left operand
        left: &'static str,
        /// Payload kind of the right operand
        right: &'static str,
    },

    /// Upstream calculation failure at a given time index and factor.
    #[error("Calculation failed at time index {time_index}, factor {factor}: {source}")]
    Calculation {
        /// Time index at which the failure occurred
        time_index: usize,
        /// Factor at which the failure occurred
        factor: usize,
        /// Underlying error
        #[source]
        source: Box<SimulationError>,
    },
}

impl SimulationError {
    /// Create an `IndexOutOfRange` error.
    pub fn index_out_of_range(what: &'static str, index: usize, len: usize) -> Self {
        SimulationError::IndexOutOfRange { what, index, len }
    }

    /// Create an `InvalidParameter` error.
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        SimulationError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Wrap this error with the time index and factor it occurred at.
    pub fn at(self, time_index: usize, factor: usize) -> Self {
        SimulationError::Calculation {
            time_index,
            factor,
            source: Box::new(self),
        }
    }

    /// Returns `true` for errors that must abort the current session.
    ///
    /// Graph invariant breaks and shape mismatches would silently corrupt
    /// derivative results if the session continued.
    pub fn is_fatal(&self) -> bool {
        match self {
            SimulationError::GraphInvariant(_) | SimulationError::DimensionMismatch { .. } => {
                true
            }
            SimulationError::Calculation { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

/// Check that `index < len`.
#[inline]
pub fn check_index(what: &'static str, index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(SimulationError::index_out_of_range(what, index, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_out_of_range_display() {
        let err = SimulationError::index_out_of_range("time", 10, 4);
        assert!(err.to_string().contains("time index 10"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_calculation_keeps_location() {
        let err = SimulationError::invalid_parameter("loading", "not finite").at(2, 1);
        let msg = err.to_string();
        assert!(msg.contains("time index 2"));
        assert!(msg.contains("factor 1"));
        assert!(msg.contains("loading"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(SimulationError::GraphInvariant("parent 3 >= 3".into()).is_fatal());
        assert!(SimulationError::GraphInvariant("x".into()).at(0, 0).is_fatal());
        assert!(!SimulationError::PayloadMismatch {
            left: "double",
            right: "float"
        }
        .is_fatal());
    }

    #[test]
    fn test_check_index() {
        assert!(check_index("factor", 0, 1).is_ok());
        assert_eq!(
            check_index("factor", 1, 1),
            Err(SimulationError::IndexOutOfRange {
                what: "factor",
                index: 1,
                len: 1
            })
        );
    }
}
