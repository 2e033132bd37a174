//! Path-wise numeric payload.
//!
//! [`PathValues`] is the numeric container underneath every random variable:
//! either a single deterministic value or one value per Monte Carlo path,
//! tagged with the filtration time at which it becomes known.
//!
//! All operations are pure and return new values. Path storage is shared
//! through an `Arc<[T]>`, so cloning a value never copies its paths.
//!
//! ## Broadcasting
//!
//! Binary operations broadcast a deterministic operand against a path-wise
//! one. Two path-wise operands must have the same number of paths.
//!
//! ## Parallelism
//!
//! Element-wise loops over more than [`PARALLEL_THRESHOLD`] paths run on the
//! rayon thread pool. Each output element depends only on the inputs at the
//! same path, so results are identical to the sequential loop.

use std::fmt::Debug;
use std::sync::Arc;

use num_traits::Float;
use rayon::prelude::*;

use crate::error::{check_index, Result, SimulationError};

/// Number of paths from which element-wise operations are parallelised.
pub const PARALLEL_THRESHOLD: usize = 16_384;

/// Floating-point element type of a path vector (`f64` or `f32`).
pub trait Real: Float + Send + Sync + Debug + 'static {}

impl<T: Float + Send + Sync + Debug + 'static> Real for T {}

#[derive(Clone, Debug, PartialEq)]
enum Storage<T> {
    Scalar(T),
    Paths(Arc<[T]>),
}

/// Deterministic or path-wise value with a filtration time.
///
/// # Examples
///
/// ```
/// use stochastic_core::PathValues;
///
/// let x = PathValues::from_paths(1.0, vec![1.0_f64, 2.0, 3.0]).unwrap();
/// let y = PathValues::scalar(0.5, 2.0_f64);
///
/// let z = x.add_product_scalar(&y, 0.5).unwrap(); // x + 0.5 * y
/// assert_eq!(z.to_f64_vec(), vec![2.0, 3.0, 4.0]);
/// assert_eq!(z.filtration_time(), 1.0);
/// assert!((x.average() - 2.0).abs() < 1e-15);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PathValues<T> {
    time: f64,
    storage: Storage<T>,
}

impl<T: Real> PathValues<T> {
    /// Deterministic constant, known at any time.
    pub fn constant(value: T) -> Self {
        Self::scalar(f64::NEG_INFINITY, value)
    }

    /// Deterministic value with filtration time `time`.
    pub fn scalar(time: f64, value: T) -> Self {
        Self {
            time,
            storage: Storage::Scalar(value),
        }
    }

    /// Path-wise value with filtration time `time`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `values` is empty.
    pub fn from_paths(time: f64, values: Vec<T>) -> Result<Self> {
        if values.is_empty() {
            return Err(SimulationError::invalid_parameter(
                "values",
                "a path-wise value needs at least one path",
            ));
        }
        Ok(Self {
            time,
            storage: Storage::Paths(values.into()),
        })
    }

    /// Filtration time of the value.
    #[inline]
    pub fn filtration_time(&self) -> f64 {
        self.time
    }

    /// `true` if the value is the same on every path.
    #[inline]
    pub fn is_deterministic(&self) -> bool {
        matches!(self.storage, Storage::Scalar(_))
    }

    /// Number of stored values (1 for deterministic values).
    #[inline]
    pub fn size(&self) -> usize {
        match &self.storage {
            Storage::Scalar(_) => 1,
            Storage::Paths(p) => p.len(),
        }
    }

    /// The deterministic value, if any.
    pub fn scalar_value(&self) -> Option<T> {
        match self.storage {
            Storage::Scalar(v) => Some(v),
            Storage::Paths(_) => None,
        }
    }

    /// The path vector, if any.
    pub fn paths(&self) -> Option<&[T]> {
        match &self.storage {
            Storage::Scalar(_) => None,
            Storage::Paths(p) => Some(p),
        }
    }

    /// Value on `path`. Deterministic values answer for every path.
    pub fn get(&self, path: usize) -> Result<T> {
        match &self.storage {
            Storage::Scalar(v) => Ok(*v),
            Storage::Paths(p) => {
                check_index("path", path, p.len())?;
                Ok(p[path])
            }
        }
    }

    /// Values converted to `f64` (a single entry for deterministic values).
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match &self.storage {
            Storage::Scalar(v) => vec![v.to_f64().unwrap_or(f64::NAN)],
            Storage::Paths(p) => p.iter().map(|v| v.to_f64().unwrap_or(f64::NAN)).collect(),
        }
    }

    /// Convert to another element type.
    pub fn cast<U: Real>(&self) -> PathValues<U> {
        let convert = |v: T| U::from(v).unwrap_or_else(U::nan);
        let storage = match &self.storage {
            Storage::Scalar(v) => Storage::Scalar(convert(*v)),
            Storage::Paths(p) => Storage::Paths(tabulate(p.len(), |i| convert(p[i]))),
        };
        PathValues {
            time: self.time,
            storage,
        }
    }

    /// `self + other`.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a + b)
    }

    /// `self - other`.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a - b)
    }

    /// `self * other`.
    pub fn mult(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a * b)
    }

    /// `self + value`.
    pub fn add_scalar(&self, value: T) -> Self {
        self.map(|a| a + value)
    }

    /// `self * value`.
    pub fn mult_scalar(&self, value: T) -> Self {
        self.map(|a| a * value)
    }

    /// `self + factor1 * factor2`, evaluated with a fused multiply-add.
    pub fn add_product(&self, factor1: &Self, factor2: &Self) -> Result<Self> {
        let n = common_size(&[self, factor1, factor2])?;
        let time = self.time.max(factor1.time).max(factor2.time);
        let f = |i: usize| factor1.at(i).mul_add(factor2.at(i), self.at(i));
        Ok(Self::build(time, n, f))
    }

    /// `self + factor * scale`, evaluated with a fused multiply-add.
    pub fn add_product_scalar(&self, factor: &Self, scale: T) -> Result<Self> {
        self.zip_with(factor, |a, b| b.mul_add(scale, a))
    }

    /// Arithmetic mean across paths.
    pub fn average(&self) -> T {
        match &self.storage {
            Storage::Scalar(v) => *v,
            Storage::Paths(p) => sum(p.iter().copied()) / len_as::<T>(p.len()),
        }
    }

    /// Population variance across paths.
    pub fn variance(&self) -> T {
        match &self.storage {
            Storage::Scalar(_) => T::zero(),
            Storage::Paths(p) => {
                let mean = self.average();
                sum(p.iter().map(|&v| (v - mean) * (v - mean))) / len_as::<T>(p.len())
            }
        }
    }

    /// Population covariance across paths.
    pub fn covariance(&self, other: &Self) -> Result<T> {
        let n = match common_size(&[self, other])? {
            None => return Ok(T::zero()),
            Some(n) => n,
        };
        let mean_a = self.average();
        let mean_b = other.average();
        let total = sum((0..n).map(|i| (self.at(i) - mean_a) * (other.at(i) - mean_b)));
        Ok(total / len_as::<T>(n))
    }

    /// Broadcast access without bounds check against the common size.
    #[inline]
    fn at(&self, i: usize) -> T {
        match &self.storage {
            Storage::Scalar(v) => *v,
            Storage::Paths(p) => p[i],
        }
    }

    fn map(&self, f: impl Fn(T) -> T + Sync + Send) -> Self {
        let storage = match &self.storage {
            Storage::Scalar(v) => Storage::Scalar(f(*v)),
            Storage::Paths(p) => Storage::Paths(tabulate(p.len(), |i| f(p[i]))),
        };
        Self {
            time: self.time,
            storage,
        }
    }

    fn zip_with(&self, other: &Self, f: impl Fn(T, T) -> T + Sync + Send) -> Result<Self> {
        let n = common_size(&[self, other])?;
        let time = self.time.max(other.time);
        Ok(Self::build(time, n, |i| f(self.at(i), other.at(i))))
    }

    fn build(time: f64, n: Option<usize>, f: impl Fn(usize) -> T + Sync + Send) -> Self {
        let storage = match n {
            None => Storage::Scalar(f(0)),
            Some(n) => Storage::Paths(tabulate(n, f)),
        };
        Self { time, storage }
    }
}

/// Common path count of the operands, `None` if all are deterministic.
fn common_size<T: Real>(operands: &[&PathValues<T>]) -> Result<Option<usize>> {
    let mut size = None;
    for operand in operands {
        if let Storage::Paths(p) = &operand.storage {
            match size {
                None => size = Some(p.len()),
                Some(n) if n != p.len() => {
                    return Err(SimulationError::DimensionMismatch {
                        what: "number of paths",
                        expected: n,
                        got: p.len(),
                    })
                }
                Some(_) => {}
            }
        }
    }
    Ok(size)
}

fn tabulate<T: Real>(n: usize, f: impl Fn(usize) -> T + Sync + Send) -> Arc<[T]> {
    if n >= PARALLEL_THRESHOLD {
        (0..n).into_par_iter().map(f).collect::<Vec<T>>().into()
    } else {
        (0..n).map(f).collect()
    }
}

fn sum<T: Real>(values: impl Iterator<Item = T>) -> T {
    values.fold(T::zero(), |acc, v| acc + v)
}

fn len_as<T: Real>(n: usize) -> T {
    T::from(n).unwrap_or_else(T::nan)
}
