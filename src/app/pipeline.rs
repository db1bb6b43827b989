//! Shared "estimate pipeline" logic.
//!
//! Keeping this in one place keeps the workflow
//! config -> CSV ingest -> sample -> engine
//! out of the presentation code.

use tracing::warn;

use crate::cli::EstimateArgs;
use crate::config::build_config;
use crate::domain::{EngineConfig, Sample};
use crate::engine::{Engine, EngineReport};
use crate::error::AppError;
use crate::io::ingest::{IngestedData, load_flood_records};

/// All computed outputs of a single `levee estimate` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub config: EngineConfig,
    pub ingest: IngestedData,
    pub sample: Sample,
    pub report: EngineReport,
}

/// Execute the full estimate pipeline and return the computed outputs.
pub fn run_estimate(args: &EstimateArgs) -> Result<RunOutput, AppError> {
    // 1) Resolve configuration (file + CLI overrides).
    let config = build_config(args.config.as_deref(), &args.overrides())?;

    // 2) Load and clean flood records.
    let ingest = load_flood_records(&args.input)?;
    if !ingest.row_errors.is_empty() {
        warn!(dropped = ingest.row_errors.len(), "some rows were dropped during cleaning");
    }

    run_estimate_with_data(config, ingest)
}

/// Execute the engine on already-ingested records.
pub fn run_estimate_with_data(config: EngineConfig, ingest: IngestedData) -> Result<RunOutput, AppError> {
    let sample = ingest.sample()?;
    let report = Engine::new(config.clone()).run(&sample)?;
    Ok(RunOutput {
        config,
        ingest,
        sample,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DistributionFamily;
    use crate::io::ingest::parse_flood_csv;

    #[test]
    fn pipeline_runs_on_ingested_csv() {
        let ingest = parse_flood_csv(
            "year,height\n1990,1.2\n1991,1.5\n1992,1.1\n1993,1.8\n1994,1.3\n1995,2.0\n1996,1.4\n1997,oops\n",
        )
        .unwrap();
        let config = EngineConfig {
            families: vec![DistributionFamily::Normal],
            ..EngineConfig::default()
        };
        let out = run_estimate_with_data(config, ingest).unwrap();
        assert_eq!(out.sample.len(), 7);
        assert_eq!(out.ingest.row_errors.len(), 1);
        assert!(out.report.best_threshold().unwrap().height > 2.0);
    }

    #[test]
    fn engine_errors_keep_their_exit_code() {
        let ingest = parse_flood_csv("year,height\n1990,-1.0\n1991,-2.0\n").unwrap();
        let config = EngineConfig {
            families: vec![DistributionFamily::LogNormal],
            ..EngineConfig::default()
        };
        let err = run_estimate_with_data(config, ingest).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
