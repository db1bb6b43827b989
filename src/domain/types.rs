//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed by reference through fitting, scoring and threshold computation
//! - exported to JSON reports
//! - reloaded later for plotting

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Ordered historical sample of extreme-event magnitudes (flood heights).
///
/// Values are finite; emptiness is allowed at construction and rejected by the
/// fitter so that the error carries the family being fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sample {
    values: Vec<f64>,
}

impl Sample {
    pub fn new(values: Vec<f64>) -> Result<Self, EngineError> {
        if let Some((i, v)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(EngineError::unsupported(
                None,
                format!("observation #{} is not finite ({v})", i + 1),
            ));
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    /// Values sorted ascending (a fresh copy; the sample itself stays ordered as given).
    pub fn sorted(&self) -> Vec<f64> {
        let mut out = self.values.clone();
        out.sort_by(f64::total_cmp);
        out
    }
}

impl TryFrom<Vec<f64>> for Sample {
    type Error = EngineError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Sample::new(values)
    }
}

/// Continuous probability law that can be fitted to a sample.
///
/// Declaration order matters: it is the final tie-breaker in model selection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DistributionFamily {
    Normal,
    #[serde(alias = "log-normal")]
    #[value(name = "lognormal", alias = "log-normal")]
    LogNormal,
    Gumbel,
    #[serde(alias = "extreme-value")]
    #[value(alias = "extreme-value")]
    Gev,
    Weibull,
    #[serde(alias = "exp")]
    #[value(alias = "exp")]
    Exponential,
    Gamma,
}

impl DistributionFamily {
    pub const ALL: [DistributionFamily; 7] = [
        DistributionFamily::Normal,
        DistributionFamily::LogNormal,
        DistributionFamily::Gumbel,
        DistributionFamily::Gev,
        DistributionFamily::Weibull,
        DistributionFamily::Exponential,
        DistributionFamily::Gamma,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            DistributionFamily::Normal => "Normal",
            DistributionFamily::LogNormal => "Log-Normal",
            DistributionFamily::Gumbel => "Gumbel",
            DistributionFamily::Gev => "GEV",
            DistributionFamily::Weibull => "Weibull",
            DistributionFamily::Exponential => "Exponential",
            DistributionFamily::Gamma => "Gamma",
        }
    }

    /// Parameter names, in the order they are stored in [`FittedModel::params`].
    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            DistributionFamily::Normal => &["mean", "std_dev"],
            DistributionFamily::LogNormal => &["mu_log", "sigma_log"],
            DistributionFamily::Gumbel => &["location", "scale"],
            DistributionFamily::Gev => &["location", "scale", "shape"],
            DistributionFamily::Weibull => &["shape", "scale"],
            DistributionFamily::Exponential => &["rate"],
            DistributionFamily::Gamma => &["shape", "rate"],
        }
    }

    pub fn param_count(self) -> usize {
        self.param_names().len()
    }

    /// Set of values where the density is defined.
    ///
    /// GEV's true support depends on its fitted parameters; before fitting any
    /// real value is admissible.
    pub fn support(self) -> Support {
        match self {
            DistributionFamily::Normal | DistributionFamily::Gumbel | DistributionFamily::Gev => {
                Support::RealLine
            }
            DistributionFamily::Exponential => Support::NonNegative,
            DistributionFamily::LogNormal | DistributionFamily::Weibull | DistributionFamily::Gamma => {
                Support::Positive
            }
        }
    }
}

impl fmt::Display for DistributionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for DistributionFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s.trim(), true)
            .map_err(|_| format!("unknown distribution family '{s}'"))
    }
}

/// Mathematical support of a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    RealLine,
    NonNegative,
    Positive,
}

impl Support {
    pub fn contains(self, x: f64) -> bool {
        match self {
            Support::RealLine => x.is_finite(),
            Support::NonNegative => x.is_finite() && x >= 0.0,
            Support::Positive => x.is_finite() && x > 0.0,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Support::RealLine => "finite real values",
            Support::NonNegative => "values >= 0",
            Support::Positive => "values > 0",
        }
    }
}

/// Whether the engine reports the threshold of the best model only or of every fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    #[default]
    BestFit,
    AllFits,
}

/// Information criterion used to pick the best model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    #[default]
    Aic,
    Bic,
}

impl Criterion {
    pub fn metric(self) -> Metric {
        match self {
            Criterion::Aic => Metric::Aic,
            Criterion::Bic => Metric::Bic,
        }
    }
}

/// Goodness-of-fit metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// `2k − 2ℓ`
    Aic,
    /// `k ln n − 2ℓ`
    Bic,
    /// Kolmogorov–Smirnov distance between empirical and model CDF.
    Ks,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Aic, Metric::Bic, Metric::Ks];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Aic => "AIC",
            Metric::Bic => "BIC",
            Metric::Ks => "KS",
        }
    }

    pub fn lower_is_better(self) -> bool {
        match self {
            Metric::Aic | Metric::Bic | Metric::Ks => true,
        }
    }
}

/// Iteration budget for the numerical estimators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitOptions {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            tolerance: 1e-10,
        }
    }
}

/// Everything that affects a single engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Target exceedance probability, in (0, 1).
    pub risk_level: f64,
    pub families: Vec<DistributionFamily>,
    pub selection_mode: SelectionMode,
    pub criterion: Criterion,
    pub solver: FitOptions,
}

pub const DEFAULT_RISK_LEVEL: f64 = 0.01;

pub const DEFAULT_FAMILIES: [DistributionFamily; 4] = [
    DistributionFamily::Normal,
    DistributionFamily::LogNormal,
    DistributionFamily::Gumbel,
    DistributionFamily::Gev,
];

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_level: DEFAULT_RISK_LEVEL,
            families: DEFAULT_FAMILIES.to_vec(),
            selection_mode: SelectionMode::default(),
            criterion: Criterion::default(),
            solver: FitOptions::default(),
        }
    }
}

/// A family with maximum-likelihood parameters for one sample.
///
/// AIC/BIC are derived on demand so they can never disagree with the
/// log-likelihood they come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    family: DistributionFamily,
    params: Vec<f64>,
    log_likelihood: f64,
    sample_size: usize,
}

impl FittedModel {
    /// Build a fitted model, rejecting wrong arity and non-finite values.
    pub fn new(
        family: DistributionFamily,
        params: Vec<f64>,
        log_likelihood: f64,
        sample_size: usize,
    ) -> Result<Self, EngineError> {
        if params.len() != family.param_count() {
            return Err(EngineError::fit_failure(
                family,
                format!(
                    "expected {} parameters, got {}",
                    family.param_count(),
                    params.len()
                ),
            ));
        }
        if let Some((name, v)) = family
            .param_names()
            .iter()
            .zip(params.iter())
            .find(|(_, v)| !v.is_finite())
        {
            return Err(EngineError::fit_failure(
                family,
                format!("non-finite parameter {name} = {v}"),
            ));
        }
        if !log_likelihood.is_finite() {
            return Err(EngineError::fit_failure(
                family,
                format!("non-finite log-likelihood {log_likelihood}"),
            ));
        }
        Ok(Self {
            family,
            params,
            log_likelihood,
            sample_size,
        })
    }

    pub fn family(&self) -> DistributionFamily {
        self.family
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn aic(&self) -> f64 {
        2.0 * self.param_count() as f64 - 2.0 * self.log_likelihood
    }

    pub fn bic(&self) -> f64 {
        (self.sample_size as f64).ln() * self.param_count() as f64 - 2.0 * self.log_likelihood
    }

    /// `name=value` pairs for display.
    pub fn named_params(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.family
            .param_names()
            .iter()
            .copied()
            .zip(self.params.iter().copied())
    }
}

/// A score attached to a borrowed fitted model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoodnessOfFitScore<'a> {
    pub model: &'a FittedModel,
    pub metric: Metric,
    pub value: f64,
    pub lower_is_better: bool,
}

impl GoodnessOfFitScore<'_> {
    pub fn to_record(&self) -> ScoreRecord {
        ScoreRecord {
            family: self.model.family(),
            metric: self.metric,
            value: self.value,
            lower_is_better: self.lower_is_better,
        }
    }
}

/// Owned form of [`GoodnessOfFitScore`] for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub family: DistributionFamily,
    pub metric: Metric,
    pub value: f64,
    pub lower_is_better: bool,
}

/// Design height for one model at one exceedance probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResult {
    pub model: FittedModel,
    pub exceedance_probability: f64,
    pub height: f64,
}

/// Descriptive statistics of a sample (box-plot style).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub n: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Points outside `[q1 − 1.5·IQR, q3 + 1.5·IQR]`.
    pub iqr_outliers: usize,
}
