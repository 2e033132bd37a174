//! Simulation configuration.
//!
//! [`SimulationConfig`] gathers the knobs of one simulation session: the
//! path count, the uniform time grid, the number of independent factors,
//! the seed and the payload kind the session's factory produces.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use stochastic_aad::{PayloadKind, RandomVariableFactory};
use stochastic_core::TimeDiscretization;

use crate::brownian::BrownianMotion;
use crate::error::ConfigError;

/// Maximum number of simulation paths allowed.
pub const MAX_PATHS: usize = 10_000_000;

/// Maximum number of time steps allowed.
pub const MAX_STEPS: usize = 10_000;

/// Immutable simulation configuration.
///
/// Use [`SimulationConfigBuilder`] to construct instances.
///
/// # Examples
///
/// ```rust
/// use stochastic_aad::PayloadKind;
/// use stochastic_models::SimulationConfig;
///
/// let config = SimulationConfig::builder()
///     .n_paths(10_000)
///     .n_steps(12)
///     .dt(1.0 / 12.0)
///     .n_factors(3)
///     .seed(42)
///     .payload_kind(PayloadKind::Differentiable)
///     .build()
///     .expect("valid configuration");
///
/// let factory = config.factory();
/// let brownian = config.brownian_motion(factory).unwrap();
/// assert_eq!(config.n_factors(), 3);
/// # let _ = brownian;
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationConfig {
    n_paths: usize,
    n_steps: usize,
    dt: f64,
    n_factors: usize,
    seed: u64,
    payload_kind: PayloadKind,
}

impl SimulationConfig {
    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::default()
    }

    /// Number of simulation paths.
    #[inline]
    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    /// Number of time steps.
    #[inline]
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Length of every time step.
    #[inline]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of independent factors.
    #[inline]
    pub fn n_factors(&self) -> usize {
        self.n_factors
    }

    /// Seed of the increment generator.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Payload kind of the session factory.
    #[inline]
    pub fn payload_kind(&self) -> PayloadKind {
        self.payload_kind
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `n_paths` is 0 or greater than 10,000,000
    /// - `n_steps` is 0 or greater than 10,000
    /// - `n_factors` is 0
    /// - `dt` is not finite and strictly positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_paths == 0 || self.n_paths > MAX_PATHS {
            return Err(ConfigError::InvalidPathCount(self.n_paths));
        }
        if self.n_steps == 0 || self.n_steps > MAX_STEPS {
            return Err(ConfigError::InvalidStepCount(self.n_steps));
        }
        if self.n_factors == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "n_factors",
                value: "must be at least 1".to_string(),
            });
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "dt",
                value: format!("{} is not a finite positive step", self.dt),
            });
        }
        Ok(())
    }

    /// Uniform grid `0, dt, ..., n_steps * dt`.
    pub fn time_discretization(&self) -> stochastic_core::Result<Arc<TimeDiscretization>> {
        TimeDiscretization::uniform(0.0, self.n_steps, self.dt).map(Arc::new)
    }

    /// Fresh factory for the configured payload kind.
    pub fn factory(&self) -> RandomVariableFactory {
        RandomVariableFactory::new(self.payload_kind)
    }

    /// Independent Brownian motion with the configured shape, creating its
    /// increments through `factory`.
    pub fn brownian_motion(
        &self,
        factory: RandomVariableFactory,
    ) -> stochastic_core::Result<BrownianMotion> {
        BrownianMotion::standard(
            self.time_discretization()?,
            self.n_factors,
            self.n_paths,
            self.seed,
            factory,
        )
    }
}

/// Builder for [`SimulationConfig`].
///
/// `n_paths` and `n_steps` are required; the other values default to
/// `dt = 1.0`, one factor, seed 0 and [`PayloadKind::Double`].
#[derive(Clone, Debug)]
pub struct SimulationConfigBuilder {
    n_paths: Option<usize>,
    n_steps: Option<usize>,
    dt: f64,
    n_factors: usize,
    seed: u64,
    payload_kind: PayloadKind,
}

impl Default for SimulationConfigBuilder {
    fn default() -> Self {
        Self {
            n_paths: None,
            n_steps: None,
            dt: 1.0,
            n_factors: 1,
            seed: 0,
            payload_kind: PayloadKind::default(),
        }
    }
}

impl SimulationConfigBuilder {
    /// Sets the number of simulation paths, in [1, 10_000_000].
    #[inline]
    pub fn n_paths(mut self, n_paths: usize) -> Self {
        self.n_paths = Some(n_paths);
        self
    }

    /// Sets the number of time steps, in [1, 10_000].
    #[inline]
    pub fn n_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = Some(n_steps);
        self
    }

    /// Sets the length of each time step.
    #[inline]
    pub fn dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Sets the number of independent factors.
    #[inline]
    pub fn n_factors(mut self, n_factors: usize) -> Self {
        self.n_factors = n_factors;
        self
    }

    /// Sets the seed for reproducibility.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the payload kind.
    #[inline]
    pub fn payload_kind(mut self, payload_kind: PayloadKind) -> Self {
        self.payload_kind = payload_kind;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required value is missing or
    /// [`SimulationConfig::validate`] fails.
    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let n_paths = self.n_paths.ok_or(ConfigError::InvalidParameter {
            name: "n_paths",
            value: "must be specified".to_string(),
        })?;

        let n_steps = self.n_steps.ok_or(ConfigError::InvalidParameter {
            name: "n_steps",
            value: "must be specified".to_string(),
        })?;

        let config = SimulationConfig {
            n_paths,
            n_steps,
            dt: self.dt,
            n_factors: self.n_factors,
            seed: self.seed,
            payload_kind: self.payload_kind,
        };

        config.validate()?;
        Ok(config)
    }
}
