//! CLI command implementations
//!
//! Each submodule implements a specific CLI command. Commands build a
//! serialisable report and hand it to [`emit`] for rendering.

use clap::ValueEnum;
use serde::Serialize;

use crate::Result;

pub mod correlate;
pub mod simulate;

/// Report rendering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
}

/// A command result that renders as a table or as JSON.
pub trait Report: Serialize {
    /// Table rendering, including the trailing newline.
    fn render_table(&self) -> String;
}

/// Render `report` to standard output.
pub fn emit<R: Report>(report: &R, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print!("{}", report.render_table()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}
