//! Brent's method root finder.
//!
//! Combines bisection, secant and inverse quadratic interpolation. Given a
//! valid bracket it always converges, which is what the profile-likelihood
//! equations of the fitter need: each of them is monotone in its single
//! unknown, so a bracket can be found by expanding outward.

use tracing::trace;

use crate::domain::FitOptions;
use crate::math::SolverError;

/// Find a root of `f` in `[a, b]`.
///
/// Requires `f(a)` and `f(b)` to have opposite signs (or one of them to be zero).
pub fn brent_root<F>(f: F, a: f64, b: f64, opts: &FitOptions) -> Result<f64, SolverError>
where
    F: Fn(f64) -> f64,
{
    if !(a.is_finite() && b.is_finite()) {
        return Err(SolverError::InvalidInput(format!("non-finite bracket [{a}, {b}]")));
    }

    let mut a = a;
    let mut b = b;
    let mut fa = f(a);
    let mut fb = f(b);

    if !(fa.is_finite() && fb.is_finite()) {
        return Err(SolverError::InvalidInput(format!(
            "non-finite function value at bracket ends: f({a})={fa}, f({b})={fb}"
        )));
    }
    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }
    if fa * fb > 0.0 {
        return Err(SolverError::NoBracket { a, b });
    }

    if fa.abs() < fb.abs() {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }

    let mut c = a;
    let mut fc = fa;
    let mut d = b - a;
    let mut e = d;

    for iteration in 0..opts.max_iterations {
        // Tolerance relative to the magnitude of the iterate.
        let tol = opts.tolerance * (1.0 + b.abs());
        let m = 0.5 * (c - b);

        if fb == 0.0 || m.abs() <= tol {
            trace!(iteration, root = b, "brent converged");
            return Ok(b);
        }

        let mut use_bisection = true;
        if e.abs() >= tol && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (p, q) = if a == c {
                // Secant step.
                (2.0 * m * s, 1.0 - s)
            } else {
                // Inverse quadratic interpolation.
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * m * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            let (p, q) = if p > 0.0 { (p, -q) } else { (-p, q) };

            if 2.0 * p < (3.0 * m * q - (tol * q).abs()).min((e * q).abs()) {
                e = d;
                d = p / q;
                use_bisection = false;
            }
        }

        if use_bisection {
            d = m;
            e = m;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol { d } else { tol.copysign(m) };
        fb = f(b);
        if !fb.is_finite() {
            return Err(SolverError::InvalidInput(format!("non-finite function value at x={b}")));
        }

        // Keep the root bracketed between b and c.
        if (fb > 0.0) == (fc > 0.0) {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }
    }

    Err(SolverError::MaxIterationsExceeded {
        iterations: opts.max_iterations,
    })
}

/// Expand `[lo, hi]` geometrically until `f` changes sign over it.
///
/// Intended for positive unknowns (shape / scale parameters). `lo` is divided
/// and `hi` multiplied by `factor` on each step, at most `max_steps` times.
pub fn expand_bracket<F>(
    f: F,
    mut lo: f64,
    mut hi: f64,
    factor: f64,
    max_steps: usize,
) -> Result<(f64, f64), SolverError>
where
    F: Fn(f64) -> f64,
{
    if !(lo > 0.0 && hi > lo && factor > 1.0) {
        return Err(SolverError::InvalidInput(format!(
            "invalid bracket expansion from [{lo}, {hi}] with factor {factor}"
        )));
    }

    let mut f_lo = f(lo);
    let mut f_hi = f(hi);
    for _ in 0..max_steps {
        if f_lo.is_finite() && f_hi.is_finite() && f_lo * f_hi <= 0.0 {
            return Ok((lo, hi));
        }
        // Move whichever end has not crossed yet (both when a value is not finite).
        let same_sign_as_lo = f_lo.is_finite() && f_hi.is_finite() && f_lo.signum() == f_hi.signum();
        if !f_lo.is_finite() || same_sign_as_lo {
            lo /= factor;
            f_lo = f(lo);
        }
        if !f_hi.is_finite() || same_sign_as_lo {
            hi *= factor;
            f_hi = f(hi);
        }
    }

    Err(SolverError::NoBracket { a: lo, b: hi })
}
