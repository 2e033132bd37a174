//! Stochastic CLI - Brownian increments and factor correlation
//!
//! Operational entry point for the simulation crates.
//!
//! # Commands
//!
//! - `stochastic simulate` - Generate independent increments and report their moments
//! - `stochastic correlate` - Combine increments through factor loadings
//!
//! # Architecture
//!
//! As the service layer, this crate only wires settings, logging and
//! report rendering around `stochastic_models`.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use stochastic_aad::PayloadKind;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod error;
mod settings;

pub use error::{CliError, Result};

use commands::correlate::LoadingSource;
use commands::OutputFormat;
use settings::{Overrides, Settings};

/// Stochastic simulation CLI
#[derive(Parser)]
#[command(name = "stochastic")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Simulation flags shared by all commands.
#[derive(Args, Debug)]
struct SimulationArgs {
    /// Number of Monte Carlo paths
    #[arg(short = 'n', long)]
    paths: Option<usize>,

    /// Number of time steps
    #[arg(long)]
    steps: Option<usize>,

    /// Length of a time step
    #[arg(long)]
    dt: Option<f64>,

    /// Number of independent factors
    #[arg(long)]
    factors: Option<usize>,

    /// Generator seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Payload kind (double, float, lazy, differentiable, unique-tape)
    #[arg(short, long)]
    payload: Option<PayloadKind>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

impl SimulationArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            paths: self.paths,
            steps: self.steps,
            dt: self.dt,
            factors: self.factors,
            seed: self.seed,
            payload: self.payload,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate independent increments and report their moments
    Simulate {
        #[command(flatten)]
        common: SimulationArgs,
    },

    /// Combine independent increments through factor loadings
    Correlate {
        #[command(flatten)]
        common: SimulationArgs,

        /// Factor-loading rows, e.g. "1,0,0;0.5,0.866,0"
        #[arg(short, long)]
        loadings: Option<String>,

        /// Correlation matrix rows, decomposed with Cholesky
        #[arg(long)]
        correlation: Option<String>,

        /// Time step of the increments
        #[arg(short, long, default_value_t = 0)]
        time_index: usize,

        /// Volatility used for the tape sensitivity run
        #[arg(long, default_value_t = 0.2)]
        volatility: f64,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_settings(config: Option<&std::path::Path>, common: &SimulationArgs) -> Result<Settings> {
    let settings = Settings::load(config)?.merge(&common.overrides());
    debug!(?settings, "resolved settings");
    Ok(settings)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Simulate { common } => {
            let settings = load_settings(cli.config.as_deref(), &common)
                .context("failed to load settings")?;
            commands::simulate::run(&settings, common.format).context("simulate failed")?;
        }
        Commands::Correlate {
            common,
            loadings,
            correlation,
            time_index,
            volatility,
        } => {
            let settings = load_settings(cli.config.as_deref(), &common)
                .context("failed to load settings")?;
            let source = LoadingSource::from_args(loadings.as_deref(), correlation.as_deref())?;
            commands::correlate::run(&settings, &source, time_index, volatility, common.format)
                .context("correlate failed")?;
        }
    }
    Ok(())
}
