use thiserror::Error;

use crate::domain::DistributionFamily;

/// Failures raised by the fitting / scoring / threshold engine.
///
/// Every variant carries enough context (family, numeric reason) for a caller
/// to decide whether to retry with other families or another risk level.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Empty sample, or values outside a family's support.
    #[error("unsupported sample{}: {reason}", family_suffix(.family))]
    UnsupportedSample {
        family: Option<DistributionFamily>,
        reason: String,
    },

    /// The estimator did not converge or produced non-finite parameters.
    #[error("fit failed for {family}: {reason}")]
    FitFailure {
        family: DistributionFamily,
        reason: String,
    },

    /// Exceedance probability outside the open interval (0, 1).
    #[error("invalid risk level {0}: exceedance probability must lie strictly between 0 and 1")]
    InvalidRiskLevel(f64),

    /// The quantile of a fitted model could not be evaluated to a finite height.
    #[error("threshold unavailable for {family}: {reason}")]
    QuantileFailure {
        family: DistributionFamily,
        reason: String,
    },

    #[error("no fitted models to score")]
    NoModelsToScore,

    #[error("no distribution family could be fitted ({})", describe_failures(.failures))]
    NoModelsFitted {
        failures: Vec<(DistributionFamily, EngineError)>,
    },

    #[error("no distribution families requested")]
    NoFamiliesRequested,
}

impl EngineError {
    pub fn unsupported(family: Option<DistributionFamily>, reason: impl Into<String>) -> Self {
        Self::UnsupportedSample {
            family,
            reason: reason.into(),
        }
    }

    pub fn fit_failure(family: DistributionFamily, reason: impl Into<String>) -> Self {
        Self::FitFailure {
            family,
            reason: reason.into(),
        }
    }

    /// Exit code used when this error terminates the `levee` binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            EngineError::UnsupportedSample { .. }
            | EngineError::InvalidRiskLevel(_)
            | EngineError::NoFamiliesRequested => 2,
            EngineError::NoModelsToScore | EngineError::NoModelsFitted { .. } => 3,
            EngineError::FitFailure { .. } | EngineError::QuantileFailure { .. } => 4,
        }
    }
}

fn family_suffix(family: &Option<DistributionFamily>) -> String {
    family.map(|f| format!(" for {f}")).unwrap_or_default()
}

fn describe_failures(failures: &[(DistributionFamily, EngineError)]) -> String {
    if failures.is_empty() {
        return "no attempts".to_string();
    }
    failures
        .iter()
        .map(|(family, err)| format!("{family}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error surfaced by the binary: a message plus the process exit code.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
