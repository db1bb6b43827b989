//! Density, CDF and quantile evaluation for every supported family.
//!
//! Parameters arrive as the plain slice stored in [`FittedModel`], in the order
//! given by [`DistributionFamily::param_names`]. Invalid parameter vectors
//! evaluate to `NaN` rather than panicking; the fitter never produces them and
//! the threshold calculator checks finiteness of everything it returns.
//!
//! Normal, Log-Normal, Weibull, Exponential and Gamma delegate to `statrs`.
//! Gumbel and GEV are written out since they are closed-form.

use statrs::distribution::{Continuous, ContinuousCDF, Exp, Gamma, LogNormal, Normal, Weibull};

use crate::domain::{DistributionFamily, FitOptions, FittedModel, Sample};
use crate::error::EngineError;
use crate::math::brent_root;

/// Below this |ξ| the GEV is evaluated as a Gumbel.
const GEV_SHAPE_EPS: f64 = 1e-9;

/// Budget for inverting CDFs that have no closed-form quantile.
const INVERSION_OPTIONS: FitOptions = FitOptions {
    max_iterations: 500,
    tolerance: 1e-14,
};

/// Capability interface of a distribution family.
///
/// Implemented by the closed [`DistributionFamily`] enum, so adding a family
/// means adding a variant and handling it in every method below.
pub trait ContinuousFamily {
    /// Maximum-likelihood fit of this family to `sample`.
    fn fit(&self, sample: &Sample, opts: &FitOptions) -> Result<FittedModel, EngineError>;

    fn ln_pdf(&self, params: &[f64], x: f64) -> f64;

    fn pdf(&self, params: &[f64], x: f64) -> f64 {
        self.ln_pdf(params, x).exp()
    }

    fn cdf(&self, params: &[f64], x: f64) -> f64;

    /// Survival function `P(X > x)`.
    fn sf(&self, params: &[f64], x: f64) -> f64;

    /// Lower-tail quantile: the value `x` with `P(X <= x) = q`.
    fn quantile(&self, params: &[f64], q: f64) -> f64;

    /// Upper-tail quantile: the value `x` with `P(X > x) = p`.
    ///
    /// Computed from `p` directly so that tiny exceedance probabilities keep
    /// full precision instead of being rounded through `1 − p`.
    fn upper_quantile(&self, params: &[f64], p: f64) -> f64;
}

impl ContinuousFamily for DistributionFamily {
    fn fit(&self, sample: &Sample, opts: &FitOptions) -> Result<FittedModel, EngineError> {
        crate::fit::fit(sample, *self, opts)
    }

    fn ln_pdf(&self, params: &[f64], x: f64) -> f64 {
        match (self, params) {
            (DistributionFamily::Normal, &[mean, sd]) => {
                Normal::new(mean, sd).map_or(f64::NAN, |d| d.ln_pdf(x))
            }
            (DistributionFamily::LogNormal, &[mu, sigma]) => {
                LogNormal::new(mu, sigma).map_or(f64::NAN, |d| d.ln_pdf(x))
            }
            (DistributionFamily::Gumbel, &[loc, scale]) => gumbel_ln_pdf(loc, scale, x),
            (DistributionFamily::Gev, &[loc, scale, shape]) => gev_ln_pdf(loc, scale, shape, x),
            (DistributionFamily::Weibull, &[shape, scale]) => {
                Weibull::new(shape, scale).map_or(f64::NAN, |d| d.ln_pdf(x))
            }
            (DistributionFamily::Exponential, &[rate]) => {
                Exp::new(rate).map_or(f64::NAN, |d| d.ln_pdf(x))
            }
            (DistributionFamily::Gamma, &[shape, rate]) => {
                Gamma::new(shape, rate).map_or(f64::NAN, |d| d.ln_pdf(x))
            }
            _ => f64::NAN,
        }
    }

    fn cdf(&self, params: &[f64], x: f64) -> f64 {
        match (self, params) {
            (DistributionFamily::Normal, &[mean, sd]) => {
                Normal::new(mean, sd).map_or(f64::NAN, |d| d.cdf(x))
            }
            (DistributionFamily::LogNormal, &[mu, sigma]) => {
                LogNormal::new(mu, sigma).map_or(f64::NAN, |d| d.cdf(x))
            }
            (DistributionFamily::Gumbel, &[loc, scale]) => {
                gev_tail(loc, scale, 0.0, x).map_or(f64::NAN, |t| (-t).exp())
            }
            (DistributionFamily::Gev, &[loc, scale, shape]) => {
                gev_tail(loc, scale, shape, x).map_or(f64::NAN, |t| (-t).exp())
            }
            (DistributionFamily::Weibull, &[shape, scale]) => {
                Weibull::new(shape, scale).map_or(f64::NAN, |d| d.cdf(x))
            }
            (DistributionFamily::Exponential, &[rate]) => {
                Exp::new(rate).map_or(f64::NAN, |d| d.cdf(x))
            }
            (DistributionFamily::Gamma, &[shape, rate]) => {
                Gamma::new(shape, rate).map_or(f64::NAN, |d| d.cdf(x))
            }
            _ => f64::NAN,
        }
    }

    fn sf(&self, params: &[f64], x: f64) -> f64 {
        match (self, params) {
            (DistributionFamily::Normal, &[mean, sd]) => {
                Normal::new(mean, sd).map_or(f64::NAN, |d| d.sf(x))
            }
            (DistributionFamily::LogNormal, &[mu, sigma]) => {
                LogNormal::new(mu, sigma).map_or(f64::NAN, |d| d.sf(x))
            }
            (DistributionFamily::Gumbel, &[loc, scale]) => {
                gev_tail(loc, scale, 0.0, x).map_or(f64::NAN, |t| -(-t).exp_m1())
            }
            (DistributionFamily::Gev, &[loc, scale, shape]) => {
                gev_tail(loc, scale, shape, x).map_or(f64::NAN, |t| -(-t).exp_m1())
            }
            (DistributionFamily::Weibull, &[shape, scale]) => {
                Weibull::new(shape, scale).map_or(f64::NAN, |d| d.sf(x))
            }
            (DistributionFamily::Exponential, &[rate]) => {
                Exp::new(rate).map_or(f64::NAN, |d| d.sf(x))
            }
            (DistributionFamily::Gamma, &[shape, rate]) => {
                Gamma::new(shape, rate).map_or(f64::NAN, |d| d.sf(x))
            }
            _ => f64::NAN,
        }
    }

    fn quantile(&self, params: &[f64], q: f64) -> f64 {
        if !(q > 0.0 && q < 1.0) {
            return f64::NAN;
        }
        match (self, params) {
            (DistributionFamily::Normal, &[mean, sd]) => {
                if sd > 0.0 { mean + sd * std_normal_quantile(q) } else { f64::NAN }
            }
            (DistributionFamily::LogNormal, &[mu, sigma]) => {
                if sigma > 0.0 { (mu + sigma * std_normal_quantile(q)).exp() } else { f64::NAN }
            }
            // -ln(q) is the reduced Gumbel variate for the lower tail.
            (DistributionFamily::Gumbel, &[loc, scale]) => gev_from_reduced(loc, scale, 0.0, -q.ln()),
            (DistributionFamily::Gev, &[loc, scale, shape]) => {
                gev_from_reduced(loc, scale, shape, -q.ln())
            }
            (DistributionFamily::Weibull, &[shape, scale]) => {
                weibull_from_log_sf(shape, scale, -(-q).ln_1p())
            }
            (DistributionFamily::Exponential, &[rate]) => {
                if rate > 0.0 { -(-q).ln_1p() / rate } else { f64::NAN }
            }
            (DistributionFamily::Gamma, &[shape, rate]) => {
                invert_positive(|x| self.cdf(params, x) - q, shape, rate)
            }
            _ => f64::NAN,
        }
    }

    fn upper_quantile(&self, params: &[f64], p: f64) -> f64 {
        if !(p > 0.0 && p < 1.0) {
            return f64::NAN;
        }
        match (self, params) {
            // Φ⁻¹(1 − p) = −Φ⁻¹(p)
            (DistributionFamily::Normal, &[mean, sd]) => {
                if sd > 0.0 { mean - sd * std_normal_quantile(p) } else { f64::NAN }
            }
            (DistributionFamily::LogNormal, &[mu, sigma]) => {
                if sigma > 0.0 { (mu - sigma * std_normal_quantile(p)).exp() } else { f64::NAN }
            }
            (DistributionFamily::Gumbel, &[loc, scale]) => {
                gev_from_reduced(loc, scale, 0.0, -(-p).ln_1p())
            }
            (DistributionFamily::Gev, &[loc, scale, shape]) => {
                gev_from_reduced(loc, scale, shape, -(-p).ln_1p())
            }
            (DistributionFamily::Weibull, &[shape, scale]) => weibull_from_log_sf(shape, scale, -p.ln()),
            (DistributionFamily::Exponential, &[rate]) => {
                if rate > 0.0 { -p.ln() / rate } else { f64::NAN }
            }
            (DistributionFamily::Gamma, &[shape, rate]) => {
                // sf is decreasing, so negate to keep the root-finder's sign convention.
                invert_positive(|x| p - self.sf(params, x), shape, rate)
            }
            _ => f64::NAN,
        }
    }
}

impl FittedModel {
    pub fn ln_pdf(&self, x: f64) -> f64 {
        self.family().ln_pdf(self.params(), x)
    }

    pub fn pdf(&self, x: f64) -> f64 {
        self.family().pdf(self.params(), x)
    }

    pub fn cdf(&self, x: f64) -> f64 {
        self.family().cdf(self.params(), x)
    }

    pub fn sf(&self, x: f64) -> f64 {
        self.family().sf(self.params(), x)
    }

    pub fn quantile(&self, q: f64) -> f64 {
        self.family().quantile(self.params(), q)
    }

    pub fn upper_quantile(&self, p: f64) -> f64 {
        self.family().upper_quantile(self.params(), p)
    }
}

/// Sum of log-densities; `-∞` as soon as one point is outside the support.
pub fn log_likelihood(family: DistributionFamily, params: &[f64], values: &[f64]) -> f64 {
    let mut total = 0.0;
    for &x in values {
        let lp = family.ln_pdf(params, x);
        if lp.is_nan() {
            return f64::NAN;
        }
        if lp == f64::NEG_INFINITY {
            return f64::NEG_INFINITY;
        }
        total += lp;
    }
    total
}

fn std_normal_quantile(q: f64) -> f64 {
    Normal::new(0.0, 1.0).map_or(f64::NAN, |d| d.inverse_cdf(q))
}

fn gumbel_ln_pdf(loc: f64, scale: f64, x: f64) -> f64 {
    if !(scale > 0.0) {
        return f64::NAN;
    }
    let z = (x - loc) / scale;
    -scale.ln() - z - (-z).exp()
}

fn gev_ln_pdf(loc: f64, scale: f64, shape: f64, x: f64) -> f64 {
    if !(scale > 0.0) {
        return f64::NAN;
    }
    if shape.abs() < GEV_SHAPE_EPS {
        return gumbel_ln_pdf(loc, scale, x);
    }
    let t = 1.0 + shape * (x - loc) / scale;
    if t <= 0.0 {
        return f64::NEG_INFINITY;
    }
    let ln_t = t.ln();
    -scale.ln() - (1.0 + 1.0 / shape) * ln_t - (-ln_t / shape).exp()
}

/// The GEV "tail" term `T(x)` with `F(x) = exp(−T(x))`.
///
/// Points beyond a finite endpoint give `T = ∞` (below a lower bound) or
/// `T = 0` (above an upper bound).
fn gev_tail(loc: f64, scale: f64, shape: f64, x: f64) -> Option<f64> {
    if !(scale > 0.0) {
        return None;
    }
    let z = (x - loc) / scale;
    if shape.abs() < GEV_SHAPE_EPS {
        return Some((-z).exp());
    }
    let t = 1.0 + shape * z;
    if t <= 0.0 {
        return Some(if shape > 0.0 { f64::INFINITY } else { 0.0 });
    }
    Some((-t.ln() / shape).exp())
}

/// Invert the GEV at reduced variate `y = −ln F(x)`.
fn gev_from_reduced(loc: f64, scale: f64, shape: f64, y: f64) -> f64 {
    if !(scale > 0.0 && y > 0.0) {
        return f64::NAN;
    }
    let ln_y = y.ln();
    if shape.abs() < GEV_SHAPE_EPS {
        return loc - scale * ln_y;
    }
    // (y^{-ξ} − 1) / ξ
    loc + scale * (-shape * ln_y).exp_m1() / shape
}

/// Weibull value whose `−ln S(x)` equals `neg_log_sf`.
fn weibull_from_log_sf(shape: f64, scale: f64, neg_log_sf: f64) -> f64 {
    if !(shape > 0.0 && scale > 0.0 && neg_log_sf > 0.0) {
        return f64::NAN;
    }
    scale * neg_log_sf.powf(1.0 / shape)
}

/// Root of an increasing function `g` on `(0, ∞)` for a Gamma(shape, rate).
fn invert_positive<G>(g: G, shape: f64, rate: f64) -> f64
where
    G: Fn(f64) -> f64,
{
    if !(shape > 0.0 && rate > 0.0) {
        return f64::NAN;
    }
    let mean = shape / rate;
    let sd = shape.sqrt() / rate;
    let mut hi = mean + 10.0 * sd;
    let mut steps = 0;
    while g(hi) < 0.0 {
        hi *= 2.0;
        steps += 1;
        if steps > 200 || !hi.is_finite() {
            return f64::NAN;
        }
    }
    brent_root(&g, 0.0, hi, &INVERSION_OPTIONS).unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fixtures() -> Vec<(DistributionFamily, Vec<f64>)> {
        vec![
            (DistributionFamily::Normal, vec![1.5, 0.3]),
            (DistributionFamily::LogNormal, vec![0.3, 0.4]),
            (DistributionFamily::Gumbel, vec![1.2, 0.25]),
            (DistributionFamily::Gev, vec![1.2, 0.25, 0.15]),
            (DistributionFamily::Gev, vec![1.2, 0.25, -0.2]),
            (DistributionFamily::Weibull, vec![2.5, 1.6]),
            (DistributionFamily::Exponential, vec![0.7]),
            (DistributionFamily::Gamma, vec![4.0, 2.5]),
        ]
    }

    #[test]
    fn cdf_inverts_quantile() {
        for (family, params) in fixtures() {
            for &q in &[1e-4, 0.01, 0.25, 0.5, 0.9, 0.99, 0.9999] {
                let x = family.quantile(&params, q);
                assert!(x.is_finite(), "{family} q={q}");
                assert_relative_eq!(family.cdf(&params, x), q, epsilon = 1e-8, max_relative = 1e-8);
            }
        }
    }

    #[test]
    fn upper_quantile_matches_survival() {
        for (family, params) in fixtures() {
            for &p in &[1e-6, 1e-3, 0.01, 0.1, 0.5] {
                let x = family.upper_quantile(&params, p);
                assert!(x.is_finite(), "{family} p={p}");
                assert_relative_eq!(family.sf(&params, x), p, epsilon = 1e-12, max_relative = 1e-7);
            }
        }
    }

    #[test]
    fn upper_quantile_agrees_with_lower_quantile() {
        for (family, params) in fixtures() {
            let a = family.upper_quantile(&params, 0.05);
            let b = family.quantile(&params, 0.95);
            assert_relative_eq!(a, b, max_relative = 1e-8);
        }
    }

    #[test]
    fn gumbel_matches_gev_with_zero_shape() {
        let x = 1.7;
        assert_relative_eq!(
            DistributionFamily::Gumbel.ln_pdf(&[1.2, 0.25], x),
            DistributionFamily::Gev.ln_pdf(&[1.2, 0.25, 0.0], x)
        );
        assert_relative_eq!(
            DistributionFamily::Gumbel.cdf(&[1.2, 0.25], x),
            DistributionFamily::Gev.cdf(&[1.2, 0.25, 1e-12], x),
            epsilon = 1e-9
        );
    }

    #[test]
    fn gev_respects_finite_endpoints() {
        // shape > 0: lower bound at loc - scale/shape = 1.2 - 0.25/0.5 = 0.7
        let params = [1.2, 0.25, 0.5];
        assert_eq!(DistributionFamily::Gev.cdf(&params, 0.6), 0.0);
        assert_eq!(DistributionFamily::Gev.ln_pdf(&params, 0.6), f64::NEG_INFINITY);
        // shape < 0: upper bound at 1.2 + 0.25/0.5 = 1.7
        let params = [1.2, 0.25, -0.5];
        assert_eq!(DistributionFamily::Gev.cdf(&params, 1.8), 1.0);
        assert_eq!(DistributionFamily::Gev.sf(&params, 1.8), 0.0);
    }

    #[test]
    fn pdf_integrates_to_one() {
        for (family, params) in fixtures() {
            let lo = family.quantile(&params, 1e-7);
            let hi = family.quantile(&params, 1.0 - 1e-7);
            let n = 20_000;
            let h = (hi - lo) / n as f64;
            let mass: f64 = (0..n)
                .map(|i| family.pdf(&params, lo + (i as f64 + 0.5) * h) * h)
                .sum();
            assert_relative_eq!(mass, 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn invalid_parameters_evaluate_to_nan() {
        assert!(DistributionFamily::Normal.pdf(&[0.0, -1.0], 0.0).is_nan());
        assert!(DistributionFamily::Gamma.quantile(&[1.0], 0.5).is_nan());
        assert!(DistributionFamily::Gumbel.upper_quantile(&[0.0, 1.0], 0.0).is_nan());
    }

    #[test]
    fn log_likelihood_is_minus_infinity_outside_support() {
        let ll = log_likelihood(DistributionFamily::LogNormal, &[0.0, 1.0], &[1.0, -2.0]);
        assert_eq!(ll, f64::NEG_INFINITY);
    }
}
