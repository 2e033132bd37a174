//! Payload kind selection.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Numeric representation underlying every random variable of a session.
///
/// The kind is fixed when a [`RandomVariableFactory`](crate::RandomVariableFactory)
/// is constructed and must not change while a simulation runs.
///
/// # Examples
///
/// ```
/// use stochastic_aad::PayloadKind;
///
/// let kind: PayloadKind = "unique-tape".parse().unwrap();
/// assert_eq!(kind, PayloadKind::UniqueTape);
/// assert!(kind.is_differentiable());
/// assert_eq!(kind.to_string(), "unique-tape");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum PayloadKind {
    /// Plain double-precision path vectors.
    #[default]
    Double,
    /// Plain single-precision path vectors.
    Float,
    /// Operation trees materialised when paths are first read.
    Lazy,
    /// Differentiable values recorded on a tape private to the factory.
    Differentiable,
    /// Differentiable values recorded on a session tape shared across factories.
    UniqueTape,
}

impl PayloadKind {
    /// All kinds, in declaration order.
    pub const ALL: [PayloadKind; 5] = [
        PayloadKind::Double,
        PayloadKind::Float,
        PayloadKind::Lazy,
        PayloadKind::Differentiable,
        PayloadKind::UniqueTape,
    ];

    /// `true` if values of this kind are recorded on a tape.
    pub fn is_differentiable(&self) -> bool {
        matches!(self, PayloadKind::Differentiable | PayloadKind::UniqueTape)
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Double => "double",
            PayloadKind::Float => "float",
            PayloadKind::Lazy => "lazy",
            PayloadKind::Differentiable => "differentiable",
            PayloadKind::UniqueTape => "unique-tape",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown payload kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown payload kind: {0}. Supported: double, float, lazy, differentiable, unique-tape")]
pub struct ParsePayloadKindError(pub String);

impl FromStr for PayloadKind {
    type Err = ParsePayloadKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "double" | "f64" => Ok(PayloadKind::Double),
            "float" | "f32" => Ok(PayloadKind::Float),
            "lazy" => Ok(PayloadKind::Lazy),
            "differentiable" | "aad" => Ok(PayloadKind::Differentiable),
            "unique-tape" | "unique_tape" | "tape" => Ok(PayloadKind::UniqueTape),
            _ => Err(ParsePayloadKindError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for kind in PayloadKind::ALL {
            assert_eq!(kind.as_str().parse::<PayloadKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_aliases_and_errors() {
        assert_eq!("F64".parse::<PayloadKind>(), Ok(PayloadKind::Double));
        assert_eq!("aad".parse::<PayloadKind>(), Ok(PayloadKind::Differentiable));
        let err = "complex".parse::<PayloadKind>().unwrap_err();
        assert!(err.to_string().contains("complex"));
    }

    #[test]
    fn test_default_is_double() {
        assert_eq!(PayloadKind::default(), PayloadKind::Double);
        assert!(!PayloadKind::Lazy.is_differentiable());
    }
}
