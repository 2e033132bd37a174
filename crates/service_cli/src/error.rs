//! CLI error types.

use thiserror::Error;

/// Result alias for command implementations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors surfaced by the `stochastic` commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file or environment could not be read.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Simulation settings out of range.
    #[error("Invalid simulation settings: {0}")]
    Settings(#[from] stochastic_models::ConfigError),

    /// Failure inside the simulation core.
    #[error("Simulation failed: {0}")]
    Simulation(#[from] stochastic_core::SimulationError),

    /// Malformed command-line argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Report could not be serialised.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}
