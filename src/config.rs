//! Run configuration management.
//!
//! Handles loading the engine configuration from a TOML parameter file and
//! merging command-line overrides on top of it.
//!
//! Priority (highest to lowest):
//! 1. CLI arguments
//! 2. Config file (`--config`, or `levee.toml` in the working directory)
//! 3. Default values

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::{Criterion, DistributionFamily, EngineConfig, FitOptions, SelectionMode};
use crate::error::AppError;

/// Config file picked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "levee.toml";

/// Configuration error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Configuration file error: {0}")]
    FileError(String),

    #[error("Invalid configuration: {0}")]
    Parse(String),

    #[error("Invalid risk_level: {0}. Must lie strictly between 0 and 1")]
    InvalidRiskLevel(f64),

    #[error("Invalid configuration: `families` must not be empty")]
    NoFamilies,

    #[error("Invalid solver settings: {0}")]
    InvalidSolver(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(2, err.to_string())
    }
}

/// Contents of a parameter file. Missing keys take defaults; unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Target exceedance probability
    pub risk_level: f64,
    /// Candidate families, in preference order for reporting
    pub families: Vec<DistributionFamily>,
    pub selection_mode: SelectionMode,
    pub criterion: Criterion,
    /// Iteration budget of the numerical estimators
    pub solver: FitOptions,
}

impl Default for FileConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            risk_level: engine.risk_level,
            families: engine.families,
            selection_mode: engine.selection_mode,
            criterion: engine.criterion,
            solver: engine.solver,
        }
    }
}

/// Values given on the command line; `None` / empty means "not given".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub risk_level: Option<f64>,
    pub families: Vec<DistributionFamily>,
    pub selection_mode: Option<SelectionMode>,
    pub criterion: Option<Criterion>,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::FileError(format!("Failed to read '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.risk_level.is_finite() && self.risk_level > 0.0 && self.risk_level < 1.0) {
            return Err(ConfigError::InvalidRiskLevel(self.risk_level));
        }
        if self.families.is_empty() {
            return Err(ConfigError::NoFamilies);
        }
        if self.solver.max_iterations == 0 {
            return Err(ConfigError::InvalidSolver("max_iterations must be > 0".to_string()));
        }
        if !(self.solver.tolerance.is_finite() && self.solver.tolerance > 0.0) {
            return Err(ConfigError::InvalidSolver(format!(
                "tolerance must be a positive number (got {})",
                self.solver.tolerance
            )));
        }
        Ok(())
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli: &CliOverrides) {
        if let Some(p) = cli.risk_level {
            self.risk_level = p;
        }
        if !cli.families.is_empty() {
            self.families = cli.families.clone();
        }
        if let Some(mode) = cli.selection_mode {
            self.selection_mode = mode;
        }
        if let Some(criterion) = cli.criterion {
            self.criterion = criterion;
        }
    }

    pub fn into_engine_config(self) -> EngineConfig {
        EngineConfig {
            risk_level: self.risk_level,
            families: self.families,
            selection_mode: self.selection_mode,
            criterion: self.criterion,
            solver: self.solver,
        }
    }
}

/// Build the engine configuration from all sources.
///
/// An explicit `config_path` must exist; the default file is optional.
pub fn build_config(
    config_path: Option<&Path>,
    cli: &CliOverrides,
) -> Result<EngineConfig, ConfigError> {
    let path: Option<PathBuf> = match config_path {
        Some(p) => Some(p.to_path_buf()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
    };

    let mut config = match &path {
        Some(p) => {
            debug!(path = %p.display(), "loading configuration");
            FileConfig::from_file(p)?
        }
        None => FileConfig::default(),
    };

    config.merge_with_cli(cli);
    // Overrides can invalidate an otherwise valid file.
    config.validate()?;
    Ok(config.into_engine_config())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = FileConfig::from_toml_str("").unwrap();
        assert_eq!(config, FileConfig::default());
        assert_eq!(config.into_engine_config(), EngineConfig::default());
    }

    #[test]
    fn full_file_parses() {
        let toml = r#"
            risk_level = 0.002
            families = ["gumbel", "log-normal", "extreme-value"]
            selection_mode = "all-fits"
            criterion = "bic"

            [solver]
            max_iterations = 500
        "#;
        let config = FileConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.risk_level, 0.002);
        assert_eq!(
            config.families,
            vec![
                DistributionFamily::Gumbel,
                DistributionFamily::LogNormal,
                DistributionFamily::Gev
            ]
        );
        assert_eq!(config.selection_mode, SelectionMode::AllFits);
        assert_eq!(config.criterion, Criterion::Bic);
        assert_eq!(config.solver.max_iterations, 500);
        assert_eq!(config.solver.tolerance, FitOptions::default().tolerance);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = FileConfig::from_toml_str("risk = 0.01\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err}");

        let err = FileConfig::from_toml_str("[solver]\nmax_iter = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err}");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            FileConfig::from_toml_str("risk_level = 1.0").unwrap_err(),
            ConfigError::InvalidRiskLevel(1.0)
        );
        assert_eq!(
            FileConfig::from_toml_str("families = []").unwrap_err(),
            ConfigError::NoFamilies
        );
        assert!(FileConfig::from_toml_str("families = [\"cauchy\"]").is_err());
    }

    #[test]
    fn cli_overrides_file_values() {
        let path = std::env::temp_dir().join(format!("levee_cli_overrides_{}.toml", std::process::id()));
        std::fs::write(&path, "risk_level = 0.05\ncriterion = \"bic\"\n").unwrap();

        let cli = CliOverrides {
            risk_level: Some(0.001),
            families: vec![DistributionFamily::Weibull],
            ..CliOverrides::default()
        };
        let config = build_config(Some(&path), &cli).unwrap();
        assert_eq!(config.risk_level, 0.001);
        assert_eq!(config.families, vec![DistributionFamily::Weibull]);
        assert_eq!(config.criterion, Criterion::Bic);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = build_config(Some(Path::new("/definitely/not/here.toml")), &CliOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileError(_)));
        assert_eq!(AppError::from(err).exit_code(), 2);
    }

    #[test]
    fn invalid_override_is_caught() {
        let cli = CliOverrides {
            risk_level: Some(0.0),
            ..CliOverrides::default()
        };
        let path = std::env::temp_dir().join(format!("levee_empty_{}.toml", std::process::id()));
        std::fs::write(&path, "").unwrap();
        assert_eq!(build_config(Some(&path), &cli).unwrap_err(), ConfigError::InvalidRiskLevel(0.0));
        std::fs::remove_file(path).ok();
    }
}
