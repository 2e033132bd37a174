//! Brownian motions and factor composition.
//!
//! Every process here answers the same question: the increment of factor
//! `f` over time step `t` as a [`RandomVariable`] across all paths. That
//! capability is the [`IndependentIncrements`] trait; [`BrownianMotion`] is
//! the tagged enum over the concrete processes:
//!
//! - [`StandardBrownianMotion`]: independent `N(0, dt)` increments from a
//!   seeded generator
//! - [`BrownianMotionView`]: re-indexes the factors of an upstream motion
//! - [`CorrelatedBrownianMotion`]: linear combinations of upstream factors
//!   through a factor-loading matrix
//!
//! Views and correlated motions hold their upstream behind an [`Arc`], so a
//! single generated set of increments can feed several compositions.
//!
//! ## Design Philosophy
//!
//! - **Static dispatch only**: enum-based dispatch, not `Box<dyn Trait>`
//! - **Immutable once built**: cloning with a new seed or time grid
//!   constructs a fresh process; the original keeps its increments
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use stochastic_aad::RandomVariableFactory;
//! use stochastic_core::TimeDiscretization;
//! use stochastic_models::brownian::{BrownianMotion, IndependentIncrements};
//!
//! let times = Arc::new(TimeDiscretization::uniform(0.0, 4, 0.25).unwrap());
//! let independent = Arc::new(
//!     BrownianMotion::standard(times, 2, 1_000, 42, RandomVariableFactory::default()).unwrap(),
//! );
//! let correlated =
//!     BrownianMotion::correlated(Arc::clone(&independent), vec![vec![1.0, 0.0], vec![0.6, 0.8]])
//!         .unwrap();
//!
//! let dw = correlated.brownian_increment(0, 1).unwrap();
//! assert_eq!(dw.size().unwrap(), 1_000);
//! ```

use std::sync::Arc;

use stochastic_aad::{RandomVariable, RandomVariableFactory};
use stochastic_core::{Result, TimeDiscretization};

mod correlated;
mod correlation;
mod standard;
mod view;

pub use correlated::CorrelatedBrownianMotion;
pub use correlation::CorrelationMatrix;
pub use standard::StandardBrownianMotion;
pub use view::BrownianMotionView;

/// Multi-factor process with independent increments over a time grid.
///
/// `increment(t, f)` is the change of factor `f` between
/// `time_discretization().time(t)` and `time(t + 1)`. Results are
/// deterministic for a fixed seed, time grid and factor layout.
pub trait IndependentIncrements {
    /// Increment of `factor` over time step `time_index`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` unless `time_index < number_of_time_steps` and
    /// `factor < number_of_factors`.
    fn increment(&self, time_index: usize, factor: usize) -> Result<RandomVariable>;

    /// Increments of all factors over time step `time_index`.
    fn increments(&self, time_index: usize) -> Result<Vec<RandomVariable>> {
        (0..self.number_of_factors())
            .map(|factor| self.increment(time_index, factor))
            .collect()
    }

    /// Time grid of the process.
    fn time_discretization(&self) -> &Arc<TimeDiscretization>;

    /// Number of factors.
    fn number_of_factors(&self) -> usize;

    /// Number of paths of every increment.
    fn number_of_paths(&self) -> usize;

    /// Deterministic `value` in the payload kind of the process.
    fn random_variable_for_constant(&self, value: f64) -> Result<RandomVariable>;

    /// Same process driven by `seed`.
    fn clone_with_modified_seed(&self, seed: u64) -> Self
    where
        Self: Sized;

    /// Same process on another time grid.
    fn clone_with_modified_time_discretization(
        &self,
        time_discretization: Arc<TimeDiscretization>,
    ) -> Self
    where
        Self: Sized;
}

/// Brownian motion selected at construction time.
#[derive(Clone, Debug)]
pub enum BrownianMotion {
    /// Independent increments from a seeded generator.
    Standard(StandardBrownianMotion),
    /// Factor re-indexing of an upstream motion.
    View(BrownianMotionView),
    /// Factor-loading combination of an upstream motion.
    Correlated(CorrelatedBrownianMotion),
}

impl BrownianMotion {
    /// Independent Brownian motion; see [`StandardBrownianMotion::new`].
    pub fn standard(
        time_discretization: Arc<TimeDiscretization>,
        number_of_factors: usize,
        number_of_paths: usize,
        seed: u64,
        factory: RandomVariableFactory,
    ) -> Result<Self> {
        StandardBrownianMotion::new(
            time_discretization,
            number_of_factors,
            number_of_paths,
            seed,
            factory,
        )
        .map(BrownianMotion::Standard)
    }

    /// View on `upstream`; see [`BrownianMotionView::new`].
    pub fn view(upstream: Arc<BrownianMotion>, factor_map: Vec<usize>) -> Result<Self> {
        BrownianMotionView::new(upstream, factor_map).map(BrownianMotion::View)
    }

    /// Correlated combination of `upstream`; see [`CorrelatedBrownianMotion::new`].
    pub fn correlated(upstream: Arc<BrownianMotion>, factor_loadings: Vec<Vec<f64>>) -> Result<Self> {
        CorrelatedBrownianMotion::new(upstream, factor_loadings).map(BrownianMotion::Correlated)
    }

    /// Brownian increment `dW_f(t)`; alias of [`IndependentIncrements::increment`].
    #[inline]
    pub fn brownian_increment(&self, time_index: usize, factor: usize) -> Result<RandomVariable> {
        self.increment(time_index, factor)
    }

    /// Name of the variant, for logging.
    pub fn variant_name(&self) -> &'static str {
        match self {
            BrownianMotion::Standard(_) => "standard",
            BrownianMotion::View(_) => "view",
            BrownianMotion::Correlated(_) => "correlated",
        }
    }
}

impl IndependentIncrements for BrownianMotion {
    fn increment(&self, time_index: usize, factor: usize) -> Result<RandomVariable> {
        match self {
            BrownianMotion::Standard(b) => b.increment(time_index, factor),
            BrownianMotion::View(b) => b.increment(time_index, factor),
            BrownianMotion::Correlated(b) => b.increment(time_index, factor),
        }
    }

    fn time_discretization(&self) -> &Arc<TimeDiscretization> {
        match self {
            BrownianMotion::Standard(b) => b.time_discretization(),
            BrownianMotion::View(b) => b.time_discretization(),
            BrownianMotion::Correlated(b) => b.time_discretization(),
        }
    }

    fn number_of_factors(&self) -> usize {
        match self {
            BrownianMotion::Standard(b) => b.number_of_factors(),
            BrownianMotion::View(b) => b.number_of_factors(),
            BrownianMotion::Correlated(b) => b.number_of_factors(),
        }
    }

    fn number_of_paths(&self) -> usize {
        match self {
            BrownianMotion::Standard(b) => b.number_of_paths(),
            BrownianMotion::View(b) => b.number_of_paths(),
            BrownianMotion::Correlated(b) => b.number_of_paths(),
        }
    }

    fn random_variable_for_constant(&self, value: f64) -> Result<RandomVariable> {
        match self {
            BrownianMotion::Standard(b) => b.random_variable_for_constant(value),
            BrownianMotion::View(b) => b.random_variable_for_constant(value),
            BrownianMotion::Correlated(b) => b.random_variable_for_constant(value),
        }
    }

    fn clone_with_modified_seed(&self, seed: u64) -> Self {
        match self {
            BrownianMotion::Standard(b) => BrownianMotion::Standard(b.clone_with_modified_seed(seed)),
            BrownianMotion::View(b) => BrownianMotion::View(b.clone_with_modified_seed(seed)),
            BrownianMotion::Correlated(b) => {
                BrownianMotion::Correlated(b.clone_with_modified_seed(seed))
            }
        }
    }

    fn clone_with_modified_time_discretization(
        &self,
        time_discretization: Arc<TimeDiscretization>,
    ) -> Self {
        match self {
            BrownianMotion::Standard(b) => BrownianMotion::Standard(
                b.clone_with_modified_time_discretization(time_discretization),
            ),
            BrownianMotion::View(b) => {
                BrownianMotion::View(b.clone_with_modified_time_discretization(time_discretization))
            }
            BrownianMotion::Correlated(b) => BrownianMotion::Correlated(
                b.clone_with_modified_time_discretization(time_discretization),
            ),
        }
    }
}

impl From<StandardBrownianMotion> for BrownianMotion {
    fn from(b: StandardBrownianMotion) -> Self {
        BrownianMotion::Standard(b)
    }
}

impl From<BrownianMotionView> for BrownianMotion {
    fn from(b: BrownianMotionView) -> Self {
        BrownianMotion::View(b)
    }
}

impl From<CorrelatedBrownianMotion> for BrownianMotion {
    fn from(b: CorrelatedBrownianMotion) -> Self {
        BrownianMotion::Correlated(b)
    }
}
