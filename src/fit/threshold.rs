//! Risk threshold (design height) computation and density queries.
//!
//! The threshold at exceedance probability `p` is the quantile at `1 − p`,
//! evaluated in survival form so that small `p` keeps full precision.
//! Presentation code only ever reads fitted models through these functions.

use tracing::debug;

use crate::domain::{FittedModel, Sample, ThresholdResult};
use crate::error::EngineError;
use crate::math::percentile;

/// Reject exceedance probabilities outside the open interval (0, 1).
pub fn validate_risk_level(p: f64) -> Result<(), EngineError> {
    if p.is_finite() && p > 0.0 && p < 1.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidRiskLevel(p))
    }
}

/// Height exceeded with probability `p` under `model`.
pub fn threshold(model: &FittedModel, p: f64) -> Result<f64, EngineError> {
    validate_risk_level(p)?;
    let height = model.upper_quantile(p);
    if !height.is_finite() {
        return Err(EngineError::QuantileFailure {
            family: model.family(),
            reason: format!("upper quantile at p = {p} evaluated to {height}"),
        });
    }
    debug!(family = %model.family(), p, height, "threshold");
    Ok(height)
}

/// [`threshold`] packaged with the model it came from.
pub fn threshold_result(model: &FittedModel, p: f64) -> Result<ThresholdResult, EngineError> {
    Ok(ThresholdResult {
        model: model.clone(),
        exceedance_probability: p,
        height: threshold(model, p)?,
    })
}

/// Mean recurrence interval, in observation periods, of an event with exceedance probability `p`.
pub fn return_period(p: f64) -> f64 {
    1.0 / p
}

/// Empirical height exceeded by a fraction `p` of the sample (linear interpolation).
///
/// Cannot extrapolate past the sample maximum.
pub fn empirical_threshold(sample: &Sample, p: f64) -> Result<f64, EngineError> {
    validate_risk_level(p)?;
    percentile(sample, 1.0 - p)
        .ok_or_else(|| EngineError::unsupported(None, "sample is empty"))
}

/// Fitted density at `x` (zero outside the support).
pub fn density(model: &FittedModel, x: f64) -> f64 {
    let d = model.pdf(x);
    if d.is_finite() { d } else { 0.0 }
}

/// `n` evenly spaced `(x, density)` pairs covering `[x_min, x_max]`.
pub fn density_curve(model: &FittedModel, x_min: f64, x_max: f64, n: usize) -> Vec<(f64, f64)> {
    match n {
        0 => Vec::new(),
        1 => vec![(x_min, density(model, x_min))],
        _ => {
            let step = (x_max - x_min) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    let x = x_min + step * i as f64;
                    (x, density(model, x))
                })
                .collect()
        }
    }
}
