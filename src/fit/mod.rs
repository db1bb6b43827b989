//! Distribution fitting, model selection and risk thresholds.
//!
//! Responsibilities:
//!
//! - fit each candidate family by maximum likelihood (parallel across families)
//! - score fitted models (AIC / BIC / KS) and select the best one
//! - invert fitted models at an exceedance probability

pub mod fitter;
pub mod selection;
pub mod threshold;

pub use fitter::*;
pub use selection::*;
pub use threshold::*;
