//! Command-line parsing for the flood design-height estimator.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::CliOverrides;
use crate::domain::{Criterion, DistributionFamily, SelectionMode};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "levee",
    version,
    about = "Levee design height from historical flood records"
)]
pub struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit candidate distributions to a flood CSV and report the design height.
    Estimate(EstimateArgs),
    /// Clean a raw flood CSV (drop incomplete / non-numeric rows) and write it back.
    Clean(CleanArgs),
    /// Plot a previously exported report JSON.
    Plot(PlotArgs),
    /// Write a seeded synthetic flood sample drawn from a known distribution.
    Simulate(SimulateArgs),
}

#[derive(Debug, Args, Clone)]
pub struct EstimateArgs {
    /// Flood CSV with `year` and `height` columns (optional `discharge`).
    #[arg(short, long)]
    pub input: PathBuf,

    /// TOML parameter file (default: `levee.toml` if present).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target exceedance probability, e.g. 0.01 for a 1-in-100 event.
    #[arg(short = 'p', long)]
    pub risk_level: Option<f64>,

    /// Candidate family (repeatable). Replaces the configured list.
    #[arg(short, long = "family", value_enum)]
    pub families: Vec<DistributionFamily>,

    /// Report the best model only, or a threshold for every fitted model.
    #[arg(short, long, value_enum)]
    pub mode: Option<SelectionMode>,

    /// Information criterion used for selection.
    #[arg(long, value_enum)]
    pub criterion: Option<Criterion>,

    /// Render an ASCII histogram with the fitted density and design height.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the full run (fits, scores, thresholds, sample) to JSON.
    #[arg(long = "export-report")]
    pub export_report: Option<PathBuf>,
}

impl EstimateArgs {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            risk_level: self.risk_level,
            families: self.families.clone(),
            selection_mode: self.mode,
            criterion: self.criterion,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct CleanArgs {
    /// Raw flood CSV.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the cleaned CSV.
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Report JSON written by `levee estimate --export-report`.
    #[arg(short, long)]
    pub report: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Family to draw from.
    #[arg(short, long, value_enum)]
    pub family: DistributionFamily,

    /// Parameters in the family's order, comma separated (e.g. `2.0,0.5` for Gumbel location,scale).
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
    pub params: Vec<f64>,

    /// Number of observations.
    #[arg(short = 'n', long, default_value_t = 100)]
    pub count: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Year assigned to the first observation.
    #[arg(long, default_value_t = 1900)]
    pub first_year: i32,

    /// Where to write the CSV.
    #[arg(short, long)]
    pub output: PathBuf,
}
