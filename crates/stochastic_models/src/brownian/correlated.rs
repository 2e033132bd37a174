//! Correlated factors as linear combinations of an upstream motion.

use std::sync::Arc;

use stochastic_aad::RandomVariable;
use stochastic_core::{check_index, Result, SimulationError, TimeDiscretization};

use super::correlation::CorrelationMatrix;
use super::{BrownianMotion, IndependentIncrements};

/// Brownian motion with factors `dW_i = sum_j L[i][j] * dU_j`, where `dU`
/// are the upstream increments and `L` is the `n x m` factor-loading matrix.
///
/// The sum starts from the upstream constant zero and runs over `j` in
/// ascending order. Loadings equal to exactly zero are skipped, so a
/// differentiable payload records no edge to the corresponding upstream
/// factor. When the upstream factors are independent with unit variance per
/// unit time, the covariance of outputs `i` and `k` is `L[i] . L[k]` per unit
/// time. Failures while combining are reported as `Calculation` errors
/// carrying the time index and output factor.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use stochastic_aad::RandomVariableFactory;
/// use stochastic_core::TimeDiscretization;
/// use stochastic_models::brownian::{BrownianMotion, CorrelatedBrownianMotion, IndependentIncrements};
///
/// let times = Arc::new(TimeDiscretization::uniform(0.0, 1, 1.0).unwrap());
/// let independent = Arc::new(
///     BrownianMotion::standard(times, 2, 10, 3, RandomVariableFactory::default()).unwrap(),
/// );
/// let correlated = CorrelatedBrownianMotion::new(
///     Arc::clone(&independent),
///     vec![vec![0.0, 2.0]],
/// )
/// .unwrap();
///
/// let doubled = independent.increment(0, 1).unwrap().mult_scalar(2.0).unwrap();
/// assert_eq!(
///     correlated.increment(0, 0).unwrap().to_f64_vec().unwrap(),
///     doubled.to_f64_vec().unwrap(),
/// );
/// ```
#[derive(Clone, Debug)]
pub struct CorrelatedBrownianMotion {
    upstream: Arc<BrownianMotion>,
    factor_loadings: Arc<[Vec<f64>]>,
}

impl CorrelatedBrownianMotion {
    /// Combine the factors of `upstream` through `factor_loadings`.
    ///
    /// Row `i` of the matrix loads output factor `i`; every row needs one
    /// loading per upstream factor.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if the matrix has no row or a row length differs
    ///   from the upstream factor count
    /// - `InvalidParameter` if a loading is not finite
    pub fn new(upstream: Arc<BrownianMotion>, factor_loadings: Vec<Vec<f64>>) -> Result<Self> {
        if factor_loadings.is_empty() {
            return Err(SimulationError::DimensionMismatch {
                what: "factor loading rows",
                expected: 1,
                got: 0,
            });
        }
        let upstream_factors = upstream.number_of_factors();
        for (i, row) in factor_loadings.iter().enumerate() {
            if row.len() != upstream_factors {
                return Err(SimulationError::DimensionMismatch {
                    what: "factor loading columns",
                    expected: upstream_factors,
                    got: row.len(),
                });
            }
            if let Some(j) = row.iter().position(|loading| !loading.is_finite()) {
                return Err(SimulationError::invalid_parameter(
                    "factor_loadings",
                    format!("loading ({}, {}) = {} is not finite", i, j, row[j]),
                ));
            }
        }
        Ok(Self {
            upstream,
            factor_loadings: factor_loadings.into(),
        })
    }

    /// Correlate the factors of `upstream` with the Cholesky factor of
    /// `correlation`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the matrix is not positive definite, plus the
    /// errors of [`CorrelatedBrownianMotion::new`].
    pub fn from_correlation(
        upstream: Arc<BrownianMotion>,
        correlation: &CorrelationMatrix,
    ) -> Result<Self> {
        Self::new(upstream, correlation.factor_loadings()?)
    }

    /// Upstream motion.
    #[inline]
    pub fn upstream(&self) -> &Arc<BrownianMotion> {
        &self.upstream
    }

    /// Factor-loading matrix, one row per output factor.
    #[inline]
    pub fn factor_loadings(&self) -> &[Vec<f64>] {
        &self.factor_loadings
    }

    fn with_upstream(&self, upstream: BrownianMotion) -> Self {
        Self {
            upstream: Arc::new(upstream),
            factor_loadings: Arc::clone(&self.factor_loadings),
        }
    }
}

impl IndependentIncrements for CorrelatedBrownianMotion {
    fn increment(&self, time_index: usize, factor: usize) -> Result<RandomVariable> {
        check_index("factor", factor, self.factor_loadings.len())?;
        check_index(
            "time",
            time_index,
            self.time_discretization().number_of_time_steps(),
        )?;

        let mut accumulator = self.upstream.random_variable_for_constant(0.0)?;
        for (j, &loading) in self.factor_loadings[factor].iter().enumerate() {
            if loading == 0.0 {
                continue;
            }
            accumulator = self
                .upstream
                .brownian_increment(time_index, j)
                .and_then(|upstream_increment| {
                    accumulator.add_product_scalar(&upstream_increment, loading)
                })
                .map_err(|e| e.at(time_index, factor))?;
        }
        Ok(accumulator)
    }

    fn time_discretization(&self) -> &Arc<TimeDiscretization> {
        self.upstream.time_discretization()
    }

    fn number_of_factors(&self) -> usize {
        self.factor_loadings.len()
    }

    fn number_of_paths(&self) -> usize {
        self.upstream.number_of_paths()
    }

    fn random_variable_for_constant(&self, value: f64) -> Result<RandomVariable> {
        self.upstream.random_variable_for_constant(value)
    }

    fn clone_with_modified_seed(&self, seed: u64) -> Self {
        self.with_upstream(self.upstream.clone_with_modified_seed(seed))
    }

    fn clone_with_modified_time_discretization(
        &self,
        time_discretization: Arc<TimeDiscretization>,
    ) -> Self {
        self.with_upstream(
            self.upstream
                .clone_with_modified_time_discretization(time_discretization),
        )
    }
}
