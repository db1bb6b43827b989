//! Descriptive statistics on samples.
//!
//! Moments come from `statrs`; percentiles use linear interpolation between
//! order statistics (the "type 7" rule used by spreadsheet tools and pandas),
//! so that the empirical design height matches what analysts compute by hand.

use statrs::statistics::Statistics;

use crate::domain::{Sample, SampleSummary};

/// Linear-interpolated percentile of already sorted data, `q` in [0, 1].
///
/// Returns `None` for empty input or `q` outside [0, 1].
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Empirical percentile of a sample (unsorted input).
pub fn percentile(sample: &Sample, q: f64) -> Option<f64> {
    percentile_sorted(&sample.sorted(), q)
}

/// Population (maximum-likelihood) mean and standard deviation.
pub fn mean_and_population_std(values: &[f64]) -> (f64, f64) {
    (values.mean(), values.population_std_dev())
}

/// Two-sided Kolmogorov–Smirnov distance between the empirical CDF of `sorted`
/// and `cdf`.
pub fn ks_statistic<F>(sorted: &[f64], cdf: F) -> f64
where
    F: Fn(f64) -> f64,
{
    let n = sorted.len() as f64;
    sorted
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let f = cdf(x);
            let above = (i as f64 + 1.0) / n - f;
            let below = f - i as f64 / n;
            above.max(below)
        })
        .fold(0.0, f64::max)
}

/// Box-plot style summary. `None` for an empty sample.
pub fn summarize(sample: &Sample) -> Option<SampleSummary> {
    let sorted = sample.sorted();
    let q1 = percentile_sorted(&sorted, 0.25)?;
    let median = percentile_sorted(&sorted, 0.5)?;
    let q3 = percentile_sorted(&sorted, 0.75)?;
    let iqr = q3 - q1;
    let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
    let (mean, std_dev) = mean_and_population_std(&sorted);

    Some(SampleSummary {
        n: sorted.len(),
        min: sorted[0],
        q1,
        median,
        q3,
        max: sorted[sorted.len() - 1],
        mean,
        std_dev,
        iqr_outliers: sorted.iter().filter(|&&x| x < lo_fence || x > hi_fence).count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn percentile_interpolates_between_order_statistics() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(percentile_sorted(&sorted, 0.0).unwrap(), 1.0);
        assert_relative_eq!(percentile_sorted(&sorted, 1.0).unwrap(), 4.0);
        assert_relative_eq!(percentile_sorted(&sorted, 0.5).unwrap(), 2.5);
        // h = 3 * 0.95 = 2.85 -> 3 + 0.85
        assert_relative_eq!(percentile_sorted(&sorted, 0.95).unwrap(), 3.85, epsilon = 1e-12);
        assert!(percentile_sorted(&[], 0.5).is_none());
        assert!(percentile_sorted(&sorted, 1.5).is_none());
    }

    #[test]
    fn summary_flags_extreme_values() {
        let sample = Sample::new(vec![1.0, 1.1, 1.2, 1.3, 1.4, 1.5, 9.0]).unwrap();
        let s = summarize(&sample).unwrap();
        assert_eq!(s.n, 7);
        assert_relative_eq!(s.median, 1.3);
        assert_eq!(s.iqr_outliers, 1);
        assert_relative_eq!(s.max, 9.0);
    }

    #[test]
    fn population_std_uses_n_denominator() {
        let (mean, sd) = mean_and_population_std(&[1.2, 1.5, 1.1, 1.8, 1.3, 2.0, 1.4]);
        assert_relative_eq!(mean, 10.3 / 7.0, epsilon = 1e-12);
        assert_relative_eq!(sd, 0.301_018, epsilon = 1e-5);
    }

    #[test]
    fn ks_is_zero_for_perfect_uniform_grid_midpoints() {
        // Points at (i + 0.5) / n under U(0,1): distance is exactly 0.5 / n.
        let n = 10;
        let sorted: Vec<f64> = (0..n).map(|i| (i as f64 + 0.5) / n as f64).collect();
        let d = ks_statistic(&sorted, |x| x.clamp(0.0, 1.0));
        assert_relative_eq!(d, 0.05, epsilon = 1e-12);
    }
}
