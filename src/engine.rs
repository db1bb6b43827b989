//! Engine facade: fit → score → select → threshold.
//!
//! A run is a pure function of the sample and an explicit [`EngineConfig`].
//! Per-family failures are collected next to the successful fits; only a
//! structurally invalid request or "nothing could be fitted" aborts the call.

use tracing::{info, warn};

use crate::domain::{
    Criterion, DistributionFamily, EngineConfig, FitOptions, FittedModel, Metric, Sample,
    SampleSummary, ScoreRecord, SelectionMode, ThresholdResult,
};
use crate::error::EngineError;
use crate::fit::{empirical_threshold, fit_families, rank, score, threshold_result, validate_risk_level};
use crate::math::summarize;

/// Everything a caller needs to present or audit one engine run.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineReport {
    pub risk_level: f64,
    pub mode: SelectionMode,
    pub criterion: Criterion,
    /// Successful fits, in request order.
    pub fits: Vec<FittedModel>,
    /// One entry per family that could not be fitted or inverted.
    pub failures: Vec<(DistributionFamily, EngineError)>,
    pub scores: Vec<ScoreRecord>,
    /// Families ordered best → worst under `criterion`.
    pub ranking: Vec<DistributionFamily>,
    pub best: FittedModel,
    pub thresholds: Vec<ThresholdResult>,
    /// Non-parametric comparison value: the sample percentile at `1 − p`.
    pub empirical_height: f64,
    pub summary: SampleSummary,
}

impl EngineReport {
    /// Threshold of the selected model.
    pub fn best_threshold(&self) -> Option<&ThresholdResult> {
        self.thresholds.iter().find(|t| t.model == self.best)
    }

    pub fn score_of(&self, family: DistributionFamily, metric: Metric) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.family == family && s.metric == metric)
            .map(|s| s.value)
    }
}

/// Run the full pipeline for one sample.
pub fn estimate_threshold(
    sample: &Sample,
    families: &[DistributionFamily],
    p: f64,
    mode: SelectionMode,
    criterion: Criterion,
    opts: &FitOptions,
) -> Result<EngineReport, EngineError> {
    validate_risk_level(p)?;
    if sample.is_empty() {
        return Err(EngineError::unsupported(None, "sample is empty"));
    }
    if families.is_empty() {
        return Err(EngineError::NoFamiliesRequested);
    }

    let mut requested: Vec<DistributionFamily> = Vec::with_capacity(families.len());
    for &family in families {
        if !requested.contains(&family) {
            requested.push(family);
        }
    }
    info!(n = sample.len(), families = requested.len(), p, ?mode, ?criterion, "estimating threshold");

    let mut fits = Vec::new();
    let mut failures = Vec::new();
    for (family, outcome) in fit_families(sample, &requested, opts) {
        match outcome {
            Ok(model) => fits.push(model),
            Err(err) => failures.push((family, err)),
        }
    }
    if fits.is_empty() {
        return Err(EngineError::NoModelsFitted { failures });
    }

    let scored = score(&fits, sample)?;
    let ranked = rank(&scored, criterion);
    let best = ranked.first().copied().ok_or(EngineError::NoModelsToScore)?.clone();
    let ranking = ranked.iter().map(|m| m.family()).collect();
    let scores = scored.iter().map(|s| s.to_record()).collect();

    let thresholds = match mode {
        SelectionMode::BestFit => vec![threshold_result(&best, p)?],
        SelectionMode::AllFits => {
            let mut out = Vec::with_capacity(fits.len());
            for model in &fits {
                match threshold_result(model, p) {
                    Ok(t) => out.push(t),
                    Err(err) if *model != best => {
                        warn!(family = %model.family(), error = %err, "threshold unavailable");
                        failures.push((model.family(), err));
                    }
                    Err(err) => return Err(err),
                }
            }
            out
        }
    };

    let empirical_height = empirical_threshold(sample, p)?;
    let summary = summarize(sample).ok_or_else(|| EngineError::unsupported(None, "sample is empty"))?;

    info!(
        best = %best.family(),
        height = ?thresholds.iter().find(|t| t.model == best).map(|t| t.height),
        empirical_height,
        failures = failures.len(),
        "threshold estimated"
    );

    Ok(EngineReport {
        risk_level: p,
        mode,
        criterion,
        fits,
        failures,
        scores,
        ranking,
        best,
        thresholds,
        empirical_height,
        summary,
    })
}

/// Engine bound to one configuration.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn run(&self, sample: &Sample) -> Result<EngineReport, EngineError> {
        estimate_threshold(
            sample,
            &self.config.families,
            self.config.risk_level,
            self.config.selection_mode,
            self.config.criterion,
            &self.config.solver,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn heights() -> Sample {
        Sample::new(vec![1.2, 1.5, 1.1, 1.8, 1.3, 2.0, 1.4]).unwrap()
    }

    fn run(families: &[DistributionFamily], p: f64, mode: SelectionMode) -> Result<EngineReport, EngineError> {
        estimate_threshold(&heights(), families, p, mode, Criterion::Aic, &FitOptions::default())
    }

    #[test]
    fn invalid_requests_fail_before_fitting() {
        let f = [DistributionFamily::Normal];
        assert_eq!(run(&f, 0.0, SelectionMode::BestFit).unwrap_err(), EngineError::InvalidRiskLevel(0.0));
        assert_eq!(run(&[], 0.01, SelectionMode::BestFit).unwrap_err(), EngineError::NoFamiliesRequested);

        let empty = Sample::new(vec![]).unwrap();
        let err = estimate_threshold(&empty, &f, 0.01, SelectionMode::BestFit, Criterion::Aic, &FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedSample { family: None, .. }));
    }

    #[test]
    fn single_family_best_fit() {
        let report = run(&[DistributionFamily::Normal], 0.01, SelectionMode::BestFit).unwrap();
        assert_eq!(report.fits.len(), 1);
        assert_eq!(report.best, report.fits[0]);
        assert_eq!(report.thresholds.len(), 1);
        let t = report.best_threshold().unwrap();
        assert!(t.height > 2.0);
        assert_relative_eq!(t.exceedance_probability, 0.01);
        assert_eq!(report.scores.len(), 3);
        assert_eq!(report.summary.n, 7);
        // Empirical percentile cannot go past the observed maximum.
        assert!(report.empirical_height <= 2.0);
    }

    #[test]
    fn duplicates_collapse_to_first_occurrence() {
        let fams = [
            DistributionFamily::Gumbel,
            DistributionFamily::Normal,
            DistributionFamily::Gumbel,
        ];
        let report = run(&fams, 0.01, SelectionMode::AllFits).unwrap();
        let fitted: Vec<_> = report.fits.iter().map(FittedModel::family).collect();
        assert_eq!(fitted, vec![DistributionFamily::Gumbel, DistributionFamily::Normal]);
        assert_eq!(report.thresholds.len(), 2);
    }

    #[test]
    fn partial_failure_is_reported_not_thrown() {
        let sample = Sample::new(vec![-0.3, 0.4, 1.1, 0.8, 1.5, 0.2]).unwrap();
        let report = estimate_threshold(
            &sample,
            &[DistributionFamily::Normal, DistributionFamily::LogNormal],
            0.05,
            SelectionMode::AllFits,
            Criterion::Aic,
            &FitOptions::default(),
        )
        .unwrap();
        assert_eq!(report.fits.len(), 1);
        assert_eq!(report.best.family(), DistributionFamily::Normal);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, DistributionFamily::LogNormal);
        assert!(matches!(report.failures[0].1, EngineError::UnsupportedSample { .. }));
    }

    #[test]
    fn design_height_never_falls_below_the_record() {
        let sample = Sample::new(vec![1.1, 1.3, 1.35, 1.4, 1.42]).unwrap();
        let report = estimate_threshold(
            &sample,
            &[
                DistributionFamily::Normal,
                DistributionFamily::LogNormal,
                DistributionFamily::Gumbel,
                DistributionFamily::Gev,
            ],
            0.01,
            SelectionMode::AllFits,
            Criterion::Aic,
            &FitOptions::default(),
        )
        .unwrap();
        assert_ne!(report.best.family(), DistributionFamily::Gev);
        assert!(report.failures.iter().any(|(f, _)| *f == DistributionFamily::Gev));
        for t in &report.thresholds {
            assert!(t.height > 1.42, "{}: {}", t.model.family(), t.height);
        }
    }

    #[test]
    fn total_failure_lists_every_family() {
        let sample = Sample::new(vec![-1.0, -2.0, 3.0]).unwrap();
        let err = estimate_threshold(
            &sample,
            &[DistributionFamily::LogNormal, DistributionFamily::Gamma],
            0.01,
            SelectionMode::BestFit,
            Criterion::Aic,
            &FitOptions::default(),
        )
        .unwrap_err();
        match err {
            EngineError::NoModelsFitted { failures } => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[1].0, DistributionFamily::Gamma);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn engine_uses_its_config() {
        let engine = Engine::new(EngineConfig {
            risk_level: 0.001,
            families: vec![DistributionFamily::Gumbel, DistributionFamily::Normal],
            selection_mode: SelectionMode::AllFits,
            ..EngineConfig::default()
        });
        let report = engine.run(&heights()).unwrap();
        assert_relative_eq!(report.risk_level, 0.001);
        assert_eq!(report.thresholds.len(), 2);
        assert_eq!(report.ranking.len(), 2);
        assert_eq!(report.ranking[0], report.best.family());
        assert!(report.score_of(DistributionFamily::Gumbel, Metric::Ks).is_some());
    }
}
