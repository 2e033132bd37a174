//! Correlate command implementation
//!
//! Combines independent Brownian increments through a factor-loading
//! matrix and reports the empirical statistics of the correlated outputs.
//! For differentiable payloads it also records `sum_i volatility * dW_i` on
//! the session tape and reports the tape size and the sensitivity to the
//! volatility.

use std::sync::Arc;

use serde::Serialize;
use stochastic_aad::{PayloadKind, RandomVariable, RandomVariableFactory};
use stochastic_models::{BrownianMotion, CorrelationMatrix, IndependentIncrements};
use tracing::info;

use super::{emit, OutputFormat, Report};
use crate::settings::Settings;
use crate::{CliError, Result};

/// Loading matrix used when none is given.
pub const DEFAULT_LOADINGS: &str = "1,0,0;0.5,0.866,0";

/// Where the factor loadings come from.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadingSource {
    /// Loadings given directly, one row per output factor.
    Loadings(Vec<Vec<f64>>),
    /// Correlation matrix decomposed with Cholesky.
    Correlation(Vec<Vec<f64>>),
}

impl LoadingSource {
    /// Resolve the mutually exclusive `--loadings` and `--correlation` flags.
    pub fn from_args(loadings: Option<&str>, correlation: Option<&str>) -> Result<Self> {
        match (loadings, correlation) {
            (Some(_), Some(_)) => Err(CliError::InvalidArgument(
                "--loadings and --correlation are mutually exclusive".to_string(),
            )),
            (None, Some(text)) => Ok(LoadingSource::Correlation(parse_matrix(text)?)),
            (loadings, None) => Ok(LoadingSource::Loadings(parse_matrix(
                loadings.unwrap_or(DEFAULT_LOADINGS),
            )?)),
        }
    }

    /// Factor-loading rows.
    pub fn factor_loadings(&self) -> Result<Vec<Vec<f64>>> {
        match self {
            LoadingSource::Loadings(rows) => Ok(rows.clone()),
            LoadingSource::Correlation(rows) => {
                Ok(CorrelationMatrix::new(rows.clone())?.factor_loadings()?)
            }
        }
    }
}

/// Parse `"a,b;c,d"` into rows `[[a, b], [c, d]]`.
pub fn parse_matrix(text: &str) -> Result<Vec<Vec<f64>>> {
    text.split(';')
        .map(|row| {
            row.split(',')
                .map(|entry| {
                    entry.trim().parse::<f64>().map_err(|_| {
                        CliError::InvalidArgument(format!("'{}' is not a number", entry.trim()))
                    })
                })
                .collect()
        })
        .collect()
}

/// Empirical statistics of one correlated output factor.
#[derive(Clone, Debug, Serialize)]
pub struct FactorStatistics {
    /// Output factor index
    pub factor: usize,
    /// Mean across paths
    pub mean: f64,
    /// Variance across paths
    pub variance: f64,
    /// Correlation with each independent input factor
    pub correlations: Vec<f64>,
    /// Correlation implied by the loading row
    pub expected_correlations: Vec<f64>,
}

/// Size of the session tape after the sensitivity run.
#[derive(Clone, Debug, Serialize)]
pub struct TapeStatistics {
    /// Number of recorded nodes
    pub nodes: usize,
    /// Number of independent variables
    pub variables: usize,
    /// Path average of `d(sum_i volatility * dW_i) / d volatility`
    pub volatility_sensitivity: f64,
}

/// Result of the correlate command.
#[derive(Clone, Debug, Serialize)]
pub struct CorrelationReport {
    /// Payload kind of the session
    pub payload: PayloadKind,
    /// Number of paths
    pub paths: usize,
    /// Time step the increments belong to
    pub time_index: usize,
    /// Factor-loading rows
    pub loadings: Vec<Vec<f64>>,
    /// Per output factor statistics
    pub outputs: Vec<FactorStatistics>,
    /// Tape statistics for differentiable payloads
    pub tape: Option<TapeStatistics>,
}

impl Report for CorrelationReport {
    fn render_table(&self) -> String {
        let mut out = format!(
            "Correlated increments: payload={} paths={} time_index={}\n",
            self.payload, self.paths, self.time_index
        );
        out.push_str(&format!(
            "{:<8} {:>12} {:>12}  {}\n",
            "Factor", "Mean", "Variance", "Correlation with inputs (expected)"
        ));
        for stats in &self.outputs {
            let correlations: Vec<String> = stats
                .correlations
                .iter()
                .zip(&stats.expected_correlations)
                .map(|(c, e)| format!("{:+.4} ({:+.4})", c, e))
                .collect();
            out.push_str(&format!(
                "{:<8} {:>12.6} {:>12.6}  {}\n",
                stats.factor,
                stats.mean,
                stats.variance,
                correlations.join("  ")
            ));
        }
        if let Some(tape) = &self.tape {
            out.push_str(&format!(
                "Tape: nodes={} variables={} d/dvolatility={:.6}\n",
                tape.nodes, tape.variables, tape.volatility_sensitivity
            ));
        }
        out
    }
}

/// Build the correlation report.
pub fn build_report(
    settings: &Settings,
    source: &LoadingSource,
    time_index: usize,
    volatility: f64,
) -> Result<CorrelationReport> {
    let config = settings.simulation_config()?;
    if time_index >= config.n_steps() {
        return Err(CliError::InvalidArgument(format!(
            "time index {} must be below the step count {}",
            time_index,
            config.n_steps()
        )));
    }

    let loadings = source.factor_loadings()?;
    let factory = config.factory();
    let input = Arc::new(config.brownian_motion(factory.clone())?);
    let output = BrownianMotion::correlated(Arc::clone(&input), loadings.clone())?;
    info!(
        payload = %config.payload_kind(),
        paths = config.n_paths(),
        inputs = input.number_of_factors(),
        outputs = output.number_of_factors(),
        "correlating increments"
    );

    let inputs = input.increments(time_index)?;
    let outputs = output.increments(time_index)?;

    let statistics = outputs
        .iter()
        .zip(&loadings)
        .enumerate()
        .map(|(factor, (w, row))| -> Result<FactorStatistics> {
            let correlations = inputs
                .iter()
                .map(|u| correlation(w, u))
                .collect::<Result<Vec<f64>>>()?;
            let norm = row.iter().map(|l| l * l).sum::<f64>().sqrt();
            let expected_correlations = row
                .iter()
                .map(|l| if norm > 0.0 { l / norm } else { 0.0 })
                .collect();
            Ok(FactorStatistics {
                factor,
                mean: w.average()?,
                variance: w.variance()?,
                correlations,
                expected_correlations,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorrelationReport {
        payload: config.payload_kind(),
        paths: config.n_paths(),
        time_index,
        loadings,
        outputs: statistics,
        tape: tape_statistics(&factory, &outputs, volatility)?,
    })
}

/// Run the correlate command
pub fn run(
    settings: &Settings,
    source: &LoadingSource,
    time_index: usize,
    volatility: f64,
    format: OutputFormat,
) -> Result<()> {
    let report = build_report(settings, source, time_index, volatility)?;
    emit(&report, format)?;
    info!("Correlation complete");
    Ok(())
}

fn correlation(a: &RandomVariable, b: &RandomVariable) -> Result<f64> {
    let scale = (a.variance()? * b.variance()?).sqrt();
    if scale > 0.0 {
        Ok(a.covariance(b)? / scale)
    } else {
        Ok(0.0)
    }
}

fn tape_statistics(
    factory: &RandomVariableFactory,
    outputs: &[RandomVariable],
    volatility: f64,
) -> Result<Option<TapeStatistics>> {
    let Some(tape) = factory.tape() else {
        return Ok(None);
    };

    let sigma = factory.create(0.0, volatility)?;
    let mut total = factory.create_constant(0.0)?;
    for dw in outputs {
        total = total.add_product(&sigma, dw)?;
    }

    let (Some(total), Some(sigma)) = (total.as_differentiable(), sigma.as_differentiable()) else {
        return Ok(None);
    };
    let gradient = total.gradient()?;
    let volatility_sensitivity = gradient
        .get(&sigma.id())
        .map(|g| g.average())
        .unwrap_or(0.0);

    Ok(Some(TapeStatistics {
        nodes: tape.len(),
        variables: tape.number_of_variables_in_list(),
        volatility_sensitivity,
    }))
}
