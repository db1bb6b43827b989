//! Read/write report JSON files.
//!
//! Report JSON is the portable record of one engine run:
//! - request (risk level, mode, criterion)
//! - every fitted model with its scores, plus the failures
//! - thresholds and the empirical comparison height
//! - the sample itself and a precomputed density grid for quick plotting

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Criterion, DistributionFamily, FittedModel, Sample, SampleSummary, ScoreRecord, SelectionMode,
    ThresholdResult,
};
use crate::engine::EngineReport;
use crate::error::AppError;
use crate::fit::{density_curve, return_period};

const GRID_POINTS: usize = 101;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub family: DistributionFamily,
    pub reason: String,
}

/// Fitted density of the best model sampled on an even grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityGrid {
    pub height: Vec<f64>,
    pub density: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub risk_level: f64,
    pub return_period: f64,
    pub mode: SelectionMode,
    pub criterion: Criterion,
    pub best: FittedModel,
    pub fits: Vec<FittedModel>,
    pub scores: Vec<ScoreRecord>,
    pub ranking: Vec<DistributionFamily>,
    pub thresholds: Vec<ThresholdResult>,
    pub failures: Vec<FailureRecord>,
    pub empirical_height: f64,
    pub summary: SampleSummary,
    pub sample: Sample,
    pub grid: DensityGrid,
}

impl ReportFile {
    pub fn from_report(report: &EngineReport, sample: &Sample, generated_at: DateTime<Utc>) -> Self {
        let top = report
            .thresholds
            .iter()
            .map(|t| t.height)
            .fold(report.summary.max, f64::max);
        let (height, density) = density_curve(&report.best, report.summary.min, top, GRID_POINTS)
            .into_iter()
            .unzip();

        Self {
            tool: "levee".to_string(),
            generated_at,
            risk_level: report.risk_level,
            return_period: return_period(report.risk_level),
            mode: report.mode,
            criterion: report.criterion,
            best: report.best.clone(),
            fits: report.fits.clone(),
            scores: report.scores.clone(),
            ranking: report.ranking.clone(),
            thresholds: report.thresholds.clone(),
            failures: report
                .failures
                .iter()
                .map(|(family, err)| FailureRecord {
                    family: *family,
                    reason: err.to_string(),
                })
                .collect(),
            empirical_height: report.empirical_height,
            summary: report.summary.clone(),
            sample: sample.clone(),
            grid: DensityGrid { height, density },
        }
    }

    pub fn best_threshold(&self) -> Option<&ThresholdResult> {
        self.thresholds.iter().find(|t| t.model == self.best)
    }
}

/// Write a report JSON file.
pub fn write_report_json(path: &Path, report: &ReportFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))?;
    Ok(())
}

/// Read a report JSON file.
pub fn read_report_json(path: &Path) -> Result<ReportFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open report JSON '{}': {e}", path.display())))?;
    let report: ReportFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid report JSON: {e}")))?;
    Ok(report)
}
