//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - the input sample (`Sample`) and candidate families (`DistributionFamily`)
//! - run configuration (`EngineConfig`, `SelectionMode`, `Criterion`, `FitOptions`)
//! - engine outputs (`FittedModel`, `GoodnessOfFitScore`, `ThresholdResult`)

pub mod types;

pub use types::*;
