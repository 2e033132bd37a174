//! Time discretisation for Monte Carlo simulation.
//!
//! A [`TimeDiscretization`] is an ordered, strictly increasing sequence of
//! non-negative time points `t_0 < t_1 < ... < t_n`. Processes reference it
//! through an `Arc` and never mutate it.

use crate::error::{check_index, Result, SimulationError};

/// Ordered, immutable sequence of simulation time points.
///
/// # Examples
///
/// ```
/// use stochastic_core::TimeDiscretization;
///
/// let td = TimeDiscretization::uniform(0.0, 4, 0.25).unwrap();
/// assert_eq!(td.number_of_times(), 5);
/// assert_eq!(td.number_of_time_steps(), 4);
/// assert_eq!(td.time_index(0.5), Some(2));
/// assert!((td.time_step(1).unwrap() - 0.25).abs() < 1e-15);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeDiscretization {
    times: Vec<f64>,
}

impl TimeDiscretization {
    /// Create a time discretisation from explicit time points.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if fewer than one point is given, if any
    /// point is negative or non-finite, or if the points are not strictly
    /// increasing.
    pub fn from_times(times: Vec<f64>) -> Result<Self> {
        if times.is_empty() {
            return Err(SimulationError::invalid_parameter(
                "times",
                "at least one time point is required",
            ));
        }
        for (i, &t) in times.iter().enumerate() {
            if !t.is_finite() || t < 0.0 {
                return Err(SimulationError::invalid_parameter(
                    "times",
                    format!("time point {} at index {} must be finite and non-negative", t, i),
                ));
            }
        }
        if let Some(i) = times.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SimulationError::invalid_parameter(
                "times",
                format!("time points must be strictly increasing (violated at index {})", i + 1),
            ));
        }
        Ok(Self { times })
    }

    /// Create an equidistant discretisation `start, start + dt, ..., start + n_steps * dt`.
    pub fn uniform(start: f64, n_steps: usize, dt: f64) -> Result<Self> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SimulationError::invalid_parameter(
                "dt",
                format!("time step {} must be finite and positive", dt),
            ));
        }
        let times = (0..=n_steps).map(|i| start + i as f64 * dt).collect();
        Self::from_times(times)
    }

    /// Number of time points.
    #[inline]
    pub fn number_of_times(&self) -> usize {
        self.times.len()
    }

    /// Number of time steps (`number_of_times() - 1`).
    #[inline]
    pub fn number_of_time_steps(&self) -> usize {
        self.times.len() - 1
    }

    /// Time point at `index`.
    pub fn time(&self, index: usize) -> Result<f64> {
        check_index("time", index, self.times.len())?;
        Ok(self.times[index])
    }

    /// Length of the time step `t_{index+1} - t_index`.
    pub fn time_step(&self, index: usize) -> Result<f64> {
        check_index("time step", index, self.number_of_time_steps())?;
        Ok(self.times[index + 1] - self.times[index])
    }

    /// Last time point.
    #[inline]
    pub fn last_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Index of `time` if it is exactly one of the time points.
    pub fn time_index(&self, time: f64) -> Option<usize> {
        self.times.binary_search_by(|t| t.total_cmp(&time)).ok()
    }

    /// Index of the largest time point less than or equal to `time`.
    pub fn time_index_nearest_less_or_equal(&self, time: f64) -> Option<usize> {
        match self.times.binary_search_by(|t| t.total_cmp(&time)) {
            Ok(index) => Some(index),
            Err(0) => None,
            Err(insertion) => Some(insertion - 1),
        }
    }

    /// All time points.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.times
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uniform_grid() {
        let td = TimeDiscretization::uniform(0.0, 10, 0.1).unwrap();
        assert_eq!(td.number_of_times(), 11);
        assert_eq!(td.number_of_time_steps(), 10);
        assert_relative_eq!(td.last_time(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(td.time_step(9).unwrap(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_unordered_times() {
        assert!(TimeDiscretization::from_times(vec![0.0, 0.5, 0.5]).is_err());
        assert!(TimeDiscretization::from_times(vec![0.0, 1.0, 0.5]).is_err());
        assert!(TimeDiscretization::from_times(vec![-1.0, 0.0]).is_err());
        assert!(TimeDiscretization::from_times(vec![0.0, f64::NAN]).is_err());
        assert!(TimeDiscretization::from_times(vec![]).is_err());
    }

    #[test]
    fn test_rejects_bad_dt() {
        assert!(TimeDiscretization::uniform(0.0, 4, 0.0).is_err());
        assert!(TimeDiscretization::uniform(0.0, 4, f64::INFINITY).is_err());
    }

    #[test]
    fn test_out_of_range_step() {
        let td = TimeDiscretization::from_times(vec![0.0, 1.0, 3.0]).unwrap();
        assert_relative_eq!(td.time_step(1).unwrap(), 2.0);
        assert!(matches!(
            td.time_step(2),
            Err(SimulationError::IndexOutOfRange { index: 2, len: 2, .. })
        ));
        assert!(td.time(3).is_err());
    }

    #[test]
    fn test_index_lookup() {
        let td = TimeDiscretization::from_times(vec![0.0, 0.5, 2.0]).unwrap();
        assert_eq!(td.time_index(0.5), Some(1));
        assert_eq!(td.time_index(1.0), None);
        assert_eq!(td.time_index_nearest_less_or_equal(1.0), Some(1));
        assert_eq!(td.time_index_nearest_less_or_equal(5.0), Some(2));
        assert_eq!(td.time_index_nearest_less_or_equal(2.0), Some(2));
    }

    #[test]
    fn test_nearest_before_start() {
        let td = TimeDiscretization::from_times(vec![1.0, 2.0]).unwrap();
        assert_eq!(td.time_index_nearest_less_or_equal(0.5), None);
    }
}
