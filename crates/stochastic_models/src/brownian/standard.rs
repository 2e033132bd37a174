//! Independent Brownian motion driven by a seeded generator.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use stochastic_aad::{RandomVariable, RandomVariableFactory};
use stochastic_core::{check_index, Result, SimulationError, TimeDiscretization};
use tracing::debug;

use super::IndependentIncrements;
use crate::rng::NormalGenerator;

/// Increments indexed `[time_index][factor]`.
type IncrementGrid = Arc<Vec<Vec<RandomVariable>>>;

/// Generated grid and the generation of the tape it was recorded on.
struct CachedGrid {
    generation: Option<u64>,
    increments: IncrementGrid,
}

/// Brownian motion with independent `N(0, dt_i)` factor increments.
///
/// Normals are drawn path by path, then by time index, then by factor, so
/// the increments of one path do not depend on the path count. The whole
/// grid is generated on first access and created through the factory as
/// non-parameters: on a tape they are constants, never sensitivities.
///
/// Clones made with [`Clone`] share the generated grid; the
/// `clone_with_modified_*` constructors start from an empty one.
///
/// On a tape, the grid belongs to the session it was generated in. Once the
/// tape is reset, [`IndependentIncrements::increment`] fails with
/// `GraphInvariant`; a `clone_with_modified_seed(seed)` records a fresh grid
/// with the same numbers in the new session.
#[derive(Clone)]
pub struct StandardBrownianMotion {
    time_discretization: Arc<TimeDiscretization>,
    number_of_factors: usize,
    number_of_paths: usize,
    seed: u64,
    factory: RandomVariableFactory,
    increments: Arc<Mutex<Option<CachedGrid>>>,
}

impl StandardBrownianMotion {
    /// Independent Brownian motion over `time_discretization`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the factor or path count is zero or the grid
    /// has no time step.
    pub fn new(
        time_discretization: Arc<TimeDiscretization>,
        number_of_factors: usize,
        number_of_paths: usize,
        seed: u64,
        factory: RandomVariableFactory,
    ) -> Result<Self> {
        if number_of_factors == 0 {
            return Err(SimulationError::invalid_parameter(
                "number_of_factors",
                "must be at least 1",
            ));
        }
        if number_of_paths == 0 {
            return Err(SimulationError::invalid_parameter(
                "number_of_paths",
                "must be at least 1",
            ));
        }
        if time_discretization.number_of_time_steps() == 0 {
            return Err(SimulationError::invalid_parameter(
                "time_discretization",
                "needs at least two time points",
            ));
        }
        Ok(Self {
            time_discretization,
            number_of_factors,
            number_of_paths,
            seed,
            factory,
            increments: Arc::new(Mutex::new(None)),
        })
    }

    /// Seed of the generator.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Factory creating the increments.
    #[inline]
    pub fn factory(&self) -> &RandomVariableFactory {
        &self.factory
    }

    /// `true` once the increments have been generated.
    pub fn is_generated(&self) -> bool {
        self.increments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn rebuilt(&self, time_discretization: Arc<TimeDiscretization>, seed: u64) -> Self {
        Self {
            time_discretization,
            number_of_factors: self.number_of_factors,
            number_of_paths: self.number_of_paths,
            seed,
            factory: self.factory.clone(),
            increments: Arc::new(Mutex::new(None)),
        }
    }

    fn grid(&self) -> Result<IncrementGrid> {
        // Grids are immutable once stored, so a poisoned lock still holds a valid state.
        let mut guard = self.increments.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = self.factory.tape().map(|tape| tape.generation());
        if let Some(cached) = guard.as_ref() {
            if cached.generation != generation {
                return Err(SimulationError::GraphInvariant(format!(
                    "increments were recorded on tape generation {:?}, the tape is now at {:?}",
                    cached.generation, generation
                )));
            }
            return Ok(Arc::clone(&cached.increments));
        }
        let increments = Arc::new(self.generate()?);
        *guard = Some(CachedGrid {
            generation,
            increments: Arc::clone(&increments),
        });
        Ok(increments)
    }

    fn generate(&self) -> Result<Vec<Vec<RandomVariable>>> {
        let n_steps = self.time_discretization.number_of_time_steps();
        debug!(
            seed = self.seed,
            paths = self.number_of_paths,
            factors = self.number_of_factors,
            steps = n_steps,
            kind = %self.factory.kind(),
            "generating Brownian increments"
        );

        let sqrt_dt = (0..n_steps)
            .map(|i| self.time_discretization.time_step(i).map(f64::sqrt))
            .collect::<Result<Vec<f64>>>()?;

        // Draw order is path-major; storage is [time][factor][path].
        let mut rng = NormalGenerator::from_seed(self.seed);
        let mut normals = vec![0.0; n_steps * self.number_of_factors];
        let mut values =
            vec![vec![vec![0.0; self.number_of_paths]; self.number_of_factors]; n_steps];
        for path in 0..self.number_of_paths {
            rng.fill_normal(&mut normals);
            for (t, factors) in values.iter_mut().enumerate() {
                for (f, paths) in factors.iter_mut().enumerate() {
                    paths[path] = normals[t * self.number_of_factors + f] * sqrt_dt[t];
                }
            }
        }

        values
            .into_iter()
            .enumerate()
            .map(|(t, factors)| -> Result<Vec<RandomVariable>> {
                let time = self.time_discretization.time(t + 1)?;
                factors
                    .into_iter()
                    .map(|paths| self.factory.create_non_parameter(time, paths))
                    .collect()
            })
            .collect()
    }
}

impl IndependentIncrements for StandardBrownianMotion {
    fn increment(&self, time_index: usize, factor: usize) -> Result<RandomVariable> {
        check_index(
            "time",
            time_index,
            self.time_discretization.number_of_time_steps(),
        )?;
        check_index("factor", factor, self.number_of_factors)?;
        let grid = self.grid()?;
        Ok(grid[time_index][factor].clone())
    }

    fn time_discretization(&self) -> &Arc<TimeDiscretization> {
        &self.time_discretization
    }

    fn number_of_factors(&self) -> usize {
        self.number_of_factors
    }

    fn number_of_paths(&self) -> usize {
        self.number_of_paths
    }

    fn random_variable_for_constant(&self, value: f64) -> Result<RandomVariable> {
        self.factory.create_constant(value)
    }

    fn clone_with_modified_seed(&self, seed: u64) -> Self {
        self.rebuilt(Arc::clone(&self.time_discretization), seed)
    }

    fn clone_with_modified_time_discretization(
        &self,
        time_discretization: Arc<TimeDiscretization>,
    ) -> Self {
        self.rebuilt(time_discretization, self.seed)
    }
}

impl fmt::Debug for StandardBrownianMotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardBrownianMotion")
            .field("number_of_time_steps", &self.time_discretization.number_of_time_steps())
            .field("number_of_factors", &self.number_of_factors)
            .field("number_of_paths", &self.number_of_paths)
            .field("seed", &self.seed)
            .field("kind", &self.factory.kind())
            .field("generated", &self.is_generated())
            .finish()
    }
}
