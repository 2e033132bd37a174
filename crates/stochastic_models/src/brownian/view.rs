//! Factor re-indexing of an upstream Brownian motion.

use std::sync::Arc;

use stochastic_aad::RandomVariable;
use stochastic_core::{check_index, Result, SimulationError, TimeDiscretization};

use super::{BrownianMotion, IndependentIncrements};

/// Brownian motion whose factor `f` is factor `factor_map[f]` of the
/// upstream motion.
///
/// A view never generates increments itself, so it sees exactly the
/// upstream values: selecting, reordering or repeating upstream factors is
/// free. Map entries may repeat.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use stochastic_aad::RandomVariableFactory;
/// use stochastic_core::TimeDiscretization;
/// use stochastic_models::brownian::{BrownianMotion, BrownianMotionView, IndependentIncrements};
///
/// let times = Arc::new(TimeDiscretization::uniform(0.0, 2, 0.5).unwrap());
/// let upstream = Arc::new(
///     BrownianMotion::standard(times, 3, 100, 1, RandomVariableFactory::default()).unwrap(),
/// );
/// let view = BrownianMotionView::new(Arc::clone(&upstream), vec![2, 0]).unwrap();
///
/// assert_eq!(view.number_of_factors(), 2);
/// assert_eq!(
///     view.increment(1, 0).unwrap().to_f64_vec().unwrap(),
///     upstream.increment(1, 2).unwrap().to_f64_vec().unwrap(),
/// );
/// ```
#[derive(Clone, Debug)]
pub struct BrownianMotionView {
    upstream: Arc<BrownianMotion>,
    factor_map: Arc<[usize]>,
}

impl BrownianMotionView {
    /// View on `upstream` through `factor_map`.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` if the map is empty
    /// - `IndexOutOfRange` if an entry is not an upstream factor
    pub fn new(upstream: Arc<BrownianMotion>, factor_map: Vec<usize>) -> Result<Self> {
        if factor_map.is_empty() {
            return Err(SimulationError::invalid_parameter(
                "factor_map",
                "must select at least one factor",
            ));
        }
        let upstream_factors = upstream.number_of_factors();
        for &factor in &factor_map {
            check_index("upstream factor", factor, upstream_factors)?;
        }
        Ok(Self {
            upstream,
            factor_map: factor_map.into(),
        })
    }

    /// Upstream motion.
    #[inline]
    pub fn upstream(&self) -> &Arc<BrownianMotion> {
        &self.upstream
    }

    /// Upstream factor of each view factor.
    #[inline]
    pub fn factor_map(&self) -> &[usize] {
        &self.factor_map
    }

    fn with_upstream(&self, upstream: BrownianMotion) -> Self {
        Self {
            upstream: Arc::new(upstream),
            factor_map: Arc::clone(&self.factor_map),
        }
    }
}

impl IndependentIncrements for BrownianMotionView {
    fn increment(&self, time_index: usize, factor: usize) -> Result<RandomVariable> {
        check_index("factor", factor, self.factor_map.len())?;
        self.upstream
            .brownian_increment(time_index, self.factor_map[factor])
    }

    fn time_discretization(&self) -> &Arc<TimeDiscretization> {
        self.upstream.time_discretization()
    }

    fn number_of_factors(&self) -> usize {
        self.factor_map.len()
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

#[cfg(test)]
mod tests {
    use super::*;
    use stochastic_aad::RandomVariableFactory;

    fn upstream(n_factors: usize) -> Arc<BrownianMotion> {
        let times = Arc::new(TimeDiscretization::uniform(0.0, 3, 1.0).unwrap());
        Arc::new(
            BrownianMotion::standard(times, n_factors, 20, 5, RandomVariableFactory::default())
                .unwrap(),
        )
    }

    #[test]
    fn test_rejects_invalid_maps() {
        assert!(matches!(
            BrownianMotionView::new(upstream(2), vec![]),
            Err(SimulationError::InvalidParameter { .. })
        ));
        assert_eq!(
            BrownianMotionView::new(upstream(2), vec![0, 2]).unwrap_err(),
            SimulationError::IndexOutOfRange {
                what: "upstream factor",
                index: 2,
                len: 2
            }
        );
    }

    #[test]
    fn test_repeated_factors() {
        let view = BrownianMotionView::new(upstream(2), vec![1, 1]).unwrap();
        assert_eq!(
            view.increment(0, 0).unwrap().to_f64_vec().unwrap(),
            view.increment(0, 1).unwrap().to_f64_vec().unwrap()
        );
    }

    #[test]
    fn test_factor_out_of_range() {
        let view = BrownianMotionView::new(upstream(3), vec![2]).unwrap();
        assert!(matches!(
            view.increment(0, 1),
            Err(SimulationError::IndexOutOfRange { what: "factor", .. })
        ));
        assert!(matches!(
            view.increment(3, 0),
            Err(SimulationError::IndexOutOfRange { what: "time", .. })
        ));
    }

    #[test]
    fn test_shape_follows_upstream() {
        let view = BrownianMotionView::new(upstream(3), vec![0, 2]).unwrap();
        assert_eq!(view.number_of_paths(), 20);
        assert_eq!(view.time_discretization().number_of_time_steps(), 3);
        assert_eq!(view.factor_map(), &[0, 2]);
    }

    #[test]
    fn test_seed_clone_reuses_map_and_clones_upstream() {
        let view = BrownianMotionView::new(upstream(2), vec![1, 0]).unwrap();
        let before = view.increment(0, 0).unwrap().to_f64_vec().unwrap();

        let clone = view.clone_with_modified_seed(99);
        assert!(Arc::ptr_eq(&clone.factor_map, &view.factor_map));
        assert!(!Arc::ptr_eq(clone.upstream(), view.upstream()));
        assert_ne!(clone.increment(0, 0).unwrap().to_f64_vec().unwrap(), before);
        assert_eq!(view.increment(0, 0).unwrap().to_f64_vec().unwrap(), before);
    }
}
