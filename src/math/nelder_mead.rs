//! Derivative-free Nelder–Mead simplex minimiser.
//!
//! Used for likelihoods without a closed-form or one-dimensional profile
//! (GEV). The starting simplex is built deterministically from the start
//! point and per-coordinate step sizes, so repeated runs give identical
//! results.
//!
//! Infeasible points are expressed by returning `+∞` from the objective;
//! the simplex then contracts away from them.

use nalgebra::DVector;
use tracing::debug;

use crate::domain::FitOptions;
use crate::math::SolverError;

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Outcome of a successful minimisation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexMinimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
}

/// Minimise `f` starting from `x0` with initial simplex edges `steps`.
///
/// Converges when both the spread of objective values across the simplex and
/// the simplex diameter fall below `opts.tolerance` (relative to their scale).
pub fn nelder_mead<F>(
    f: F,
    x0: &[f64],
    steps: &[f64],
    opts: &FitOptions,
) -> Result<SimplexMinimum, SolverError>
where
    F: Fn(&[f64]) -> f64,
{
    let dim = x0.len();
    if dim == 0 || steps.len() != dim {
        return Err(SolverError::InvalidInput(format!(
            "start point has {dim} coordinates but {} steps were given",
            steps.len()
        )));
    }
    if steps.iter().any(|s| !(s.is_finite() && *s != 0.0)) {
        return Err(SolverError::InvalidInput("simplex steps must be finite and non-zero".into()));
    }

    let eval = |x: &DVector<f64>| {
        let v = f(x.as_slice());
        if v.is_nan() { f64::INFINITY } else { v }
    };

    let start = DVector::from_column_slice(x0);
    let mut simplex: Vec<(DVector<f64>, f64)> = Vec::with_capacity(dim + 1);
    let f0 = eval(&start);
    if !f0.is_finite() {
        return Err(SolverError::InfeasibleStart);
    }
    simplex.push((start.clone(), f0));
    for (i, &step) in steps.iter().enumerate() {
        let mut vertex = start.clone();
        vertex[i] += step;
        let fv = eval(&vertex);
        simplex.push((vertex, fv));
    }

    for iteration in 0..opts.max_iterations {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

        let best = simplex[0].1;
        let worst = simplex[dim].1;
        if converged(&simplex, opts.tolerance) {
            debug!(iteration, value = best, "nelder-mead converged");
            return Ok(SimplexMinimum {
                point: simplex[0].0.as_slice().to_vec(),
                value: best,
                iterations: iteration,
            });
        }

        // Centroid of every vertex except the worst.
        let mut centroid = DVector::zeros(dim);
        for (v, _) in &simplex[..dim] {
            centroid += v;
        }
        centroid /= dim as f64;

        let worst_point = simplex[dim].0.clone();
        let reflected = &centroid + (&centroid - &worst_point) * REFLECT;
        let f_reflected = eval(&reflected);

        if f_reflected < best {
            let expanded = &centroid + (&reflected - &centroid) * EXPAND;
            let f_expanded = eval(&expanded);
            simplex[dim] = if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            };
            continue;
        }

        if f_reflected < simplex[dim - 1].1 {
            simplex[dim] = (reflected, f_reflected);
            continue;
        }

        // Contract towards the better of the reflected and worst points.
        let (contracted, f_contracted) = if f_reflected < worst {
            let c = &centroid + (&reflected - &centroid) * CONTRACT;
            let fc = eval(&c);
            (c, fc)
        } else {
            let c = &centroid + (&worst_point - &centroid) * CONTRACT;
            let fc = eval(&c);
            (c, fc)
        };
        if f_contracted < worst.min(f_reflected) {
            simplex[dim] = (contracted, f_contracted);
            continue;
        }

        // Shrink everything towards the best vertex.
        let best_point = simplex[0].0.clone();
        for (v, fv) in simplex.iter_mut().skip(1) {
            *v = &best_point + (&*v - &best_point) * SHRINK;
            *fv = eval(v);
        }
    }

    Err(SolverError::MaxIterationsExceeded {
        iterations: opts.max_iterations,
    })
}

fn converged(simplex: &[(DVector<f64>, f64)], tolerance: f64) -> bool {
    let best = simplex[0].1;
    let worst = simplex[simplex.len() - 1].1;
    if !worst.is_finite() {
        return false;
    }
    let f_spread = (worst - best).abs() <= tolerance * (1.0 + best.abs());

    let origin = &simplex[0].0;
    let diameter = simplex[1..]
        .iter()
        .map(|(v, _)| (v - origin).amax())
        .fold(0.0, f64::max);
    let x_spread = diameter <= tolerance.sqrt() * (1.0 + origin.amax());

    f_spread && x_spread
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimises_shifted_quadratic() {
        let f = |p: &[f64]| (p[0] - 2.0).powi(2) + 3.0 * (p[1] + 1.0).powi(2);
        let res = nelder_mead(f, &[0.0, 0.0], &[0.5, 0.5], &FitOptions::default()).unwrap();
        assert!((res.point[0] - 2.0).abs() < 1e-4, "{:?}", res.point);
        assert!((res.point[1] + 1.0).abs() < 1e-4, "{:?}", res.point);
        assert!(res.value < 1e-8);
    }

    #[test]
    fn minimises_rosenbrock() {
        let f = |p: &[f64]| (1.0 - p[0]).powi(2) + 100.0 * (p[1] - p[0] * p[0]).powi(2);
        let opts = FitOptions {
            max_iterations: 5000,
            tolerance: 1e-12,
        };
        let res = nelder_mead(f, &[-1.2, 1.0], &[0.1, 0.1], &opts).unwrap();
        assert!((res.point[0] - 1.0).abs() < 1e-3, "{:?}", res.point);
        assert!((res.point[1] - 1.0).abs() < 1e-3, "{:?}", res.point);
    }

    #[test]
    fn avoids_infeasible_region() {
        // Feasible only for x > 0; minimum at x = 1.
        let f = |p: &[f64]| {
            if p[0] <= 0.0 {
                f64::INFINITY
            } else {
                p[0] - p[0].ln()
            }
        };
        let res = nelder_mead(f, &[3.0], &[1.0], &FitOptions::default()).unwrap();
        assert!((res.point[0] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn is_deterministic() {
        let f = |p: &[f64]| (p[0] - 0.3).powi(4) + (p[1] * p[0] - 1.0).powi(2);
        let opts = FitOptions::default();
        let a = nelder_mead(f, &[1.0, 1.0], &[0.2, 0.2], &opts).unwrap();
        let b = nelder_mead(f, &[1.0, 1.0], &[0.2, 0.2], &opts).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_infeasible_start() {
        let err = nelder_mead(|_| f64::INFINITY, &[0.0], &[1.0], &FitOptions::default()).unwrap_err();
        assert_eq!(err, SolverError::InfeasibleStart);
    }

    #[test]
    fn reports_exhausted_budget() {
        let f = |p: &[f64]| (p[0] - 100.0).powi(2);
        let opts = FitOptions {
            max_iterations: 3,
            tolerance: 1e-12,
        };
        let err = nelder_mead(f, &[0.0], &[0.1], &opts).unwrap_err();
        assert_eq!(err, SolverError::MaxIterationsExceeded { iterations: 3 });
    }
}
