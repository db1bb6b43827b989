//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - loads and cleans flood records
//! - runs the fitting engine
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{CleanArgs, Command, EstimateArgs, PlotArgs, SimulateArgs};
use crate::error::AppError;
use crate::plot::Marker;

pub mod pipeline;

/// Entry point for the `levee` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_tracing(if cli.verbose { "debug" } else { "info" });

    match cli.command {
        Command::Estimate(args) => handle_estimate(args),
        Command::Clean(args) => handle_clean(args),
        Command::Plot(args) => handle_plot(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

/// Log to stderr so stdout only carries reports. `RUST_LOG` wins over `default_level`.
fn init_tracing(default_level: &str) {
    // A second initialisation (e.g. from tests) is harmless.
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn handle_estimate(args: EstimateArgs) -> Result<(), AppError> {
    let run = pipeline::run_estimate(&args)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.report, Some(&run.ingest))
    );

    if args.plot {
        let mut markers = vec![Marker {
            x: run.report.empirical_height,
            symbol: ':',
        }];
        if let Some(t) = run.report.best_threshold() {
            markers.push(Marker {
                x: t.height,
                symbol: '|',
            });
        }
        let plot = crate::plot::render_overlay_plot(
            run.sample.values(),
            Some(&run.report.best),
            &markers,
            args.width,
            args.height,
        );
        println!("{plot}");
    }

    if let Some(path) = &args.export_report {
        let file = crate::io::ReportFile::from_report(&run.report, &run.sample, chrono::Utc::now());
        crate::io::write_report_json(path, &file)?;
        info!(path = %path.display(), "report written");
    }

    Ok(())
}

fn handle_clean(args: CleanArgs) -> Result<(), AppError> {
    let ingest = crate::io::load_flood_records(&args.input)?;
    crate::io::write_records_csv(&args.output, &ingest.records)?;
    for e in &ingest.row_errors {
        println!("dropped line {}: {}", e.line, e.message);
    }
    println!(
        "Cleaned data written: {} ({} of {} rows kept)",
        args.output.display(),
        ingest.rows_used(),
        ingest.rows_read
    );
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let report = crate::io::read_report_json(&args.report)?;
    let plot = crate::plot::render_report_plot(&report, args.width, args.height);
    println!("{plot}");
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let sample = crate::data::generate_sample(args.family, &args.params, args.count, args.seed)?;
    let records = crate::io::sample_to_records(&sample, args.first_year);
    crate::io::write_records_csv(&args.output, &records)?;
    println!(
        "Simulated {} {} observations written: {}",
        sample.len(),
        args.family,
        args.output.display()
    );
    Ok(())
}
