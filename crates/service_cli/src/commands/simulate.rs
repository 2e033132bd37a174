//! Simulate command implementation
//!
//! Generates independent Brownian increments and compares their empirical
//! moments with the time-step variance.

use serde::Serialize;
use stochastic_aad::PayloadKind;
use stochastic_models::IndependentIncrements;
use tracing::info;

use super::{emit, OutputFormat, Report};
use crate::settings::Settings;
use crate::Result;

/// Moments of one increment.
#[derive(Clone, Debug, Serialize)]
pub struct IncrementStatistics {
    /// Time step
    pub time_index: usize,
    /// Factor
    pub factor: usize,
    /// Mean across paths
    pub mean: f64,
    /// Variance across paths
    pub variance: f64,
    /// Length of the time step
    pub expected_variance: f64,
}

/// Result of the simulate command.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    /// Payload kind of the session
    pub payload: PayloadKind,
    /// Number of paths
    pub paths: usize,
    /// Generator seed
    pub seed: u64,
    /// One row per (time step, factor)
    pub increments: Vec<IncrementStatistics>,
}

impl Report for SimulationReport {
    fn render_table(&self) -> String {
        let mut out = format!(
            "Independent increments: payload={} paths={} seed={}\n",
            self.payload, self.paths, self.seed
        );
        out.push_str(&format!(
            "{:<6} {:<8} {:>12} {:>12} {:>12}\n",
            "Step", "Factor", "Mean", "Variance", "dt"
        ));
        for row in &self.increments {
            out.push_str(&format!(
                "{:<6} {:<8} {:>12.6} {:>12.6} {:>12.6}\n",
                row.time_index, row.factor, row.mean, row.variance, row.expected_variance
            ));
        }
        out
    }
}

/// Build the simulation report.
pub fn build_report(settings: &Settings) -> Result<SimulationReport> {
    let config = settings.simulation_config()?;
    let brownian = config.brownian_motion(config.factory())?;
    let times = brownian.time_discretization();
    info!(
        payload = %config.payload_kind(),
        paths = config.n_paths(),
        steps = config.n_steps(),
        factors = config.n_factors(),
        "simulating increments"
    );

    let mut increments = Vec::with_capacity(config.n_steps() * config.n_factors());
    for time_index in 0..times.number_of_time_steps() {
        let expected_variance = times.time_step(time_index)?;
        for (factor, dw) in brownian.increments(time_index)?.iter().enumerate() {
            increments.push(IncrementStatistics {
                time_index,
                factor,
                mean: dw.average()?,
                variance: dw.variance()?,
                expected_variance,
            });
        }
    }

    Ok(SimulationReport {
        payload: config.payload_kind(),
        paths: config.n_paths(),
        seed: config.seed(),
        increments,
    })
}

/// Run the simulate command
pub fn run(settings: &Settings, format: OutputFormat) -> Result<()> {
    let report = build_report(settings)?;
    emit(&report, format)?;
    info!("Simulation complete");
    Ok(())
}
