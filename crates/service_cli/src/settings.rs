//! CLI settings management
//!
//! Settings are resolved from, lowest to highest priority:
//! 1. Default values
//! 2. Config file (`--config`, any format the `config` crate reads)
//! 3. Environment variables with the `STOCHASTIC_` prefix
//! 4. Command-line flags

use std::path::Path;

use serde::Deserialize;
use stochastic_aad::PayloadKind;
use stochastic_models::SimulationConfig;
use tracing::debug;

use crate::Result;

/// Prefix of the environment variables read as settings.
pub const ENV_PREFIX: &str = "STOCHASTIC";

/// Simulation settings shared by all commands.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Number of Monte Carlo paths
    pub paths: usize,
    /// Number of time steps
    pub steps: usize,
    /// Length of a time step
    pub dt: f64,
    /// Number of independent factors
    pub factors: usize,
    /// Generator seed
    pub seed: u64,
    /// Payload kind of the session
    pub payload: PayloadKind,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            paths: 20_000,
            steps: 1,
            dt: 1.0,
            factors: 3,
            seed: 42,
            payload: PayloadKind::Double,
        }
    }
}

/// Flag overrides; `None` keeps the file or environment value.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    /// Path count override
    pub paths: Option<usize>,
    /// Step count override
    pub steps: Option<usize>,
    /// Step length override
    pub dt: Option<f64>,
    /// Factor count override
    pub factors: Option<usize>,
    /// Seed override
    pub seed: Option<u64>,
    /// Payload kind override
    pub payload: Option<PayloadKind>,
}

impl Settings {
    /// Load settings from an optional file and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            debug!(path = %path.display(), "reading settings file");
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Apply command-line overrides.
    pub fn merge(mut self, overrides: &Overrides) -> Self {
        if let Some(paths) = overrides.paths {
            self.paths = paths;
        }
        if let Some(steps) = overrides.steps {
            self.steps = steps;
        }
        if let Some(dt) = overrides.dt {
            self.dt = dt;
        }
        if let Some(factors) = overrides.factors {
            self.factors = factors;
        }
        if let Some(seed) = overrides.seed {
            self.seed = seed;
        }
        if let Some(payload) = overrides.payload {
            self.payload = payload;
        }
        self
    }

    /// Validated simulation configuration.
    pub fn simulation_config(&self) -> Result<SimulationConfig> {
        let config = SimulationConfig::builder()
            .n_paths(self.paths)
            .n_steps(self.steps)
            .dt(self.dt)
            .n_factors(self.factors)
            .seed(self.seed)
            .payload_kind(self.payload)
            .build()?;
        Ok(config)
    }
}
