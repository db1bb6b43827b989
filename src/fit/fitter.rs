//! Maximum-likelihood fitting of a single distribution family.
//!
//! Closed-form estimators are used where they exist (Normal, Log-Normal,
//! Exponential). Gumbel, Weibull and Gamma reduce to one monotone profile
//! equation in a single parameter, solved with Brent after a deterministic
//! bracket expansion. GEV has no such reduction and is minimised with
//! Nelder–Mead over `(location, ln scale, shape)`, starting from the Gumbel
//! fit (the GEV with zero shape).
//!
//! Every path is deterministic for a given sample and budget, and no model
//! with non-finite parameters or log-likelihood ever leaves this module.

use rayon::prelude::*;
use statrs::function::gamma::digamma;
use tracing::{debug, warn};

use crate::domain::{DistributionFamily, FitOptions, FittedModel, Sample};
use crate::error::EngineError;
use crate::math::{SolverError, brent_root, expand_bracket, mean_and_population_std, nelder_mead};
use crate::models::log_likelihood;

/// Bracket expansion factor / step cap for the profile equations.
const BRACKET_FACTOR: f64 = 2.0;
const BRACKET_STEPS: usize = 80;

/// GEV shape values at or below this make the likelihood unbounded.
const GEV_MIN_SHAPE: f64 = -1.0;
/// Fitted shapes this close to `GEV_MIN_SHAPE` are boundary solutions.
const GEV_BOUNDARY_MARGIN: f64 = 1e-3;

/// Fit `family` to `sample` by maximum likelihood.
pub fn fit(
    sample: &Sample,
    family: DistributionFamily,
    opts: &FitOptions,
) -> Result<FittedModel, EngineError> {
    validate_support(sample, family)?;
    if family != DistributionFamily::Exponential && sample.min() == sample.max() {
        return Err(EngineError::fit_failure(
            family,
            "sample has zero spread (all observations are equal)",
        ));
    }

    let values = sample.values();
    let params = match family {
        DistributionFamily::Normal => fit_normal(values, family)?,
        DistributionFamily::LogNormal => {
            let logs: Vec<f64> = values.iter().map(|x| x.ln()).collect();
            fit_normal(&logs, family)?
        }
        DistributionFamily::Gumbel => fit_gumbel(values, opts)?,
        DistributionFamily::Gev => fit_gev(values, opts)?,
        DistributionFamily::Weibull => fit_weibull(values, opts)?,
        DistributionFamily::Exponential => fit_exponential(values)?,
        DistributionFamily::Gamma => fit_gamma(values, opts)?,
    };

    let ll = log_likelihood(family, &params, values);
    let model = FittedModel::new(family, params, ll, values.len())?;
    debug!(
        family = %family,
        params = ?model.params(),
        log_likelihood = model.log_likelihood(),
        "fit complete"
    );
    Ok(model)
}

/// Fit every family independently (in parallel), keeping request order.
///
/// One family failing never affects the others.
pub fn fit_families(
    sample: &Sample,
    families: &[DistributionFamily],
    opts: &FitOptions,
) -> Vec<(DistributionFamily, Result<FittedModel, EngineError>)> {
    families
        .par_iter()
        .map(|&family| {
            let outcome = fit(sample, family, opts);
            if let Err(err) = &outcome {
                warn!(family = %family, error = %err, "family could not be fitted");
            }
            (family, outcome)
        })
        .collect()
}

fn validate_support(sample: &Sample, family: DistributionFamily) -> Result<(), EngineError> {
    if sample.is_empty() {
        return Err(EngineError::unsupported(Some(family), "sample is empty"));
    }
    let support = family.support();
    if let Some((i, x)) = sample
        .values()
        .iter()
        .enumerate()
        .find(|(_, x)| !support.contains(**x))
    {
        return Err(EngineError::unsupported(
            Some(family),
            format!(
                "observation #{} = {x} is outside the support ({})",
                i + 1,
                support.describe()
            ),
        ));
    }
    Ok(())
}

fn solver_failure(family: DistributionFamily, err: SolverError) -> EngineError {
    EngineError::fit_failure(family, err.to_string())
}

/// Population mean / standard deviation; fails on zero spread.
fn fit_normal(values: &[f64], family: DistributionFamily) -> Result<Vec<f64>, EngineError> {
    let (mean, sd) = mean_and_population_std(values);
    if !(sd.is_finite() && sd > 0.0) {
        return Err(EngineError::fit_failure(
            family,
            format!("sample has zero spread (std dev = {sd})"),
        ));
    }
    Ok(vec![mean, sd])
}

fn fit_exponential(values: &[f64]) -> Result<Vec<f64>, EngineError> {
    let (mean, _) = mean_and_population_std(values);
    if !(mean.is_finite() && mean > 0.0) {
        return Err(EngineError::fit_failure(
            DistributionFamily::Exponential,
            format!("sample mean must be > 0 (got {mean})"),
        ));
    }
    Ok(vec![1.0 / mean])
}

/// Gumbel MLE.
///
/// Solved on `zᵢ = (xᵢ − x_min) / sd` so the scale root is of order one
/// whatever the measurement unit. The standardised scale `b` solves
/// `z̄ − b − Σ zᵢwᵢ / Σ wᵢ = 0` with `wᵢ = exp(−zᵢ/b)` (all weights in (0, 1]),
/// and the location is `x_min − sd · b ln(mean(wᵢ))`.
fn fit_gumbel(values: &[f64], opts: &FitOptions) -> Result<Vec<f64>, EngineError> {
    let family = DistributionFamily::Gumbel;
    let (_, sd) = mean_and_population_std(values);
    if !(sd > 0.0) {
        return Err(EngineError::fit_failure(family, "sample has zero spread"));
    }
    let x_min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let z: Vec<f64> = values.iter().map(|&x| (x - x_min) / sd).collect();
    let n = z.len() as f64;
    let z_mean = z.iter().sum::<f64>() / n;

    let score = |b: f64| {
        let (num, den) = z.iter().fold((0.0, 0.0), |(num, den), &zi| {
            let w = (-zi / b).exp();
            (num + zi * w, den + w)
        });
        z_mean - b - num / den
    };

    let (lo, hi) = expand_bracket(score, 0.25, 2.0, BRACKET_FACTOR, BRACKET_STEPS)
        .map_err(|e| solver_failure(family, e))?;
    let b = brent_root(score, lo, hi, opts).map_err(|e| solver_failure(family, e))?;

    let mean_w = z.iter().map(|&zi| (-zi / b).exp()).sum::<f64>() / n;
    let beta = sd * b;
    Ok(vec![x_min - beta * mean_w.ln(), beta])
}

/// Weibull MLE.
///
/// The shape solves `1/k + mean(ln yᵢ) − Σ yᵢᵏ ln yᵢ / Σ yᵢᵏ = 0` on
/// `yᵢ = xᵢ / x_max` (the shape is scale-free, and `yᵢ ≤ 1` avoids overflow);
/// the scale is `x_max · mean(yᵢᵏ)^{1/k}`.
fn fit_weibull(values: &[f64], opts: &FitOptions) -> Result<Vec<f64>, EngineError> {
    let family = DistributionFamily::Weibull;
    let x_max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let logs: Vec<f64> = values.iter().map(|&x| (x / x_max).ln()).collect();
    let mean_log = logs.iter().sum::<f64>() / logs.len() as f64;
    if !(mean_log < 0.0) {
        return Err(EngineError::fit_failure(family, "sample has zero spread"));
    }

    let score = |k: f64| {
        let (num, den) = logs.iter().fold((0.0, 0.0), |(num, den), &ly| {
            let w = (k * ly).exp();
            (num + w * ly, den + w)
        });
        1.0 / k + mean_log - num / den
    };

    let (lo, hi) = expand_bracket(score, 0.5, 5.0, BRACKET_FACTOR, BRACKET_STEPS)
        .map_err(|e| solver_failure(family, e))?;
    let shape = brent_root(score, lo, hi, opts).map_err(|e| solver_failure(family, e))?;

    let mean_pow = logs.iter().map(|&ly| (shape * ly).exp()).sum::<f64>() / logs.len() as f64;
    let scale = x_max * mean_pow.powf(1.0 / shape);
    Ok(vec![shape, scale])
}

/// Gamma MLE.
///
/// The shape solves `ln α − ψ(α) = ln x̄ − mean(ln xᵢ)`; the bracket starts
/// around the Minka approximation. The rate is `α / x̄`.
fn fit_gamma(values: &[f64], opts: &FitOptions) -> Result<Vec<f64>, EngineError> {
    let family = DistributionFamily::Gamma;
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let mean_log = values.iter().map(|x| x.ln()).sum::<f64>() / n;
    let s = mean.ln() - mean_log;
    if !(s.is_finite() && s > 0.0) {
        return Err(EngineError::fit_failure(family, "sample has zero spread"));
    }

    let approx = (3.0 - s + ((s - 3.0).powi(2) + 24.0 * s).sqrt()) / (12.0 * s);
    let score = |alpha: f64| alpha.ln() - digamma(alpha) - s;

    let (lo, hi) = expand_bracket(score, 0.5 * approx, 2.0 * approx, BRACKET_FACTOR, BRACKET_STEPS)
        .map_err(|e| solver_failure(family, e))?;
    let shape = brent_root(score, lo, hi, opts).map_err(|e| solver_failure(family, e))?;
    Ok(vec![shape, shape / mean])
}

/// GEV MLE by simplex search on `(location, ln scale, shape)`.
///
/// The search runs on `(xᵢ − x̄) / sd` and is mapped back afterwards, so the
/// simplex tolerances do not depend on the measurement unit. A minimum pressed
/// against the `ξ > −1` wall means the likelihood is still increasing there and
/// no maximum exists; that is reported as a failure.
fn fit_gev(values: &[f64], opts: &FitOptions) -> Result<Vec<f64>, EngineError> {
    let family = DistributionFamily::Gev;
    let (mean, sd) = mean_and_population_std(values);
    if !(sd > 0.0) {
        return Err(EngineError::fit_failure(family, "sample has zero spread"));
    }
    let z: Vec<f64> = values.iter().map(|&x| (x - mean) / sd).collect();

    let gumbel = fit_gumbel(&z, opts).map_err(|e| match e {
        EngineError::FitFailure { reason, .. } => {
            EngineError::fit_failure(family, format!("starting point: {reason}"))
        }
        other => other,
    })?;
    let (loc0, scale0) = (gumbel[0], gumbel[1]);

    let nll = |theta: &[f64]| {
        let shape = theta[2];
        if !(shape > GEV_MIN_SHAPE) {
            return f64::INFINITY;
        }
        let params = [theta[0], theta[1].exp(), shape];
        let ll = log_likelihood(family, &params, &z);
        if ll.is_finite() { -ll } else { f64::INFINITY }
    };

    let start = [loc0, scale0.ln(), 0.0];
    let steps = [0.1 * scale0, 0.1, 0.1];
    let min = nelder_mead(nll, &start, &steps, opts).map_err(|e| solver_failure(family, e))?;
    debug!(iterations = min.iterations, nll = min.value, "gev simplex finished");

    let p = min.point;
    let shape = p[2];
    if shape - GEV_MIN_SHAPE <= GEV_BOUNDARY_MARGIN {
        return Err(EngineError::fit_failure(
            family,
            format!("shape parameter at the ξ = −1 boundary (ξ = {shape}); MLE does not exist"),
        ));
    }
    Ok(vec![mean + sd * p[0], sd * p[1].exp(), shape])
}
