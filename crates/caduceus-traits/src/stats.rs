//! Statistical utility functions shared by the vol estimators and metrics.
//!
//! All helpers ignore non-finite values and report undefined results as NaN
//! rather than failing.

/// Trading days per year used for annualization throughout the workspace.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Minimum threshold for standard deviation to avoid division by zero.
/// Values below this threshold are treated as zero variance.
pub const MIN_STD_THRESHOLD: f64 = 1e-10;

/// Collects the finite values of a slice.
#[must_use]
pub fn finite_values(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|x| x.is_finite()).collect()
}

/// Arithmetic mean of the finite values, NaN if there are none.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    let (sum, n) = values
        .iter()
        .filter(|x| x.is_finite())
        .fold((0.0, 0usize), |(s, n), &x| (s + x, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Standard deviation of the finite values with `ddof` delta degrees of freedom.
///
/// `ddof = 0` is the population estimator used for volatility, `ddof = 1` the
/// sample estimator. Returns NaN when fewer than `ddof + 1` finite values exist.
///
/// # Examples
///
/// ```
/// use caduceus_traits::stats::std_dev;
///
/// let values = [1.0, 2.0, 3.0, 4.0];
/// assert!((std_dev(&values, 0) - 1.25_f64.sqrt()).abs() < 1e-12);
/// ```
#[must_use]
pub fn std_dev(values: &[f64], ddof: usize) -> f64 {
    let finite = finite_values(values);
    let n = finite.len();
    if n <= ddof {
        return f64::NAN;
    }
    let m = finite.iter().sum::<f64>() / n as f64;
    let ss = finite.iter().map(|x| (x - m).powi(2)).sum::<f64>();
    (ss / (n - ddof) as f64).sqrt()
}

/// Pearson correlation of two equally long slices over pairs where both are finite.
///
/// NaN with fewer than two pairs or zero variance on either side.
#[must_use]
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(&x, &y)| (x, y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in &pairs {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }
    if var_a < MIN_STD_THRESHOLD || var_b < MIN_STD_THRESHOLD {
        return f64::NAN;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}
