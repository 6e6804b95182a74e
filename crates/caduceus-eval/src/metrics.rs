//! Performance metrics over daily returns and equity curves.
//!
//! Every function is pure and annualizes with a 252-day year. Undefined
//! results (empty input, zero denominators, too few observations) are
//! reported as `NaN` rather than as errors.

use caduceus_traits::stats::{TRADING_DAYS_PER_YEAR, correlation, finite_values, mean, std_dev};
use caduceus_traits::{TimeSeries, month_end};
use serde::{Deserialize, Serialize};

/// Compound annual growth rate of daily returns.
///
/// # Examples
///
/// ```
/// use caduceus_eval::metrics::compute_cagr;
///
/// let daily = vec![0.0; 252];
/// assert_eq!(compute_cagr(&daily), 0.0);
/// assert!(compute_cagr(&[]).is_nan());
/// ```
#[must_use]
pub fn compute_cagr(daily_returns: &[f64]) -> f64 {
    let finite = finite_values(daily_returns);
    if finite.is_empty() {
        return f64::NAN;
    }
    let growth: f64 = finite.iter().map(|r| 1.0 + r).product();
    growth.powf(TRADING_DAYS_PER_YEAR / finite.len() as f64) - 1.0
}

/// Annualized population volatility (ddof 0).
#[must_use]
pub fn compute_annual_vol(daily_returns: &[f64]) -> f64 {
    std_dev(daily_returns, 0) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized Sharpe ratio against an annual risk-free rate.
///
/// NaN when volatility is zero (within machine epsilon) or undefined.
#[must_use]
pub fn compute_sharpe(daily_returns: &[f64], risk_free_annual: f64) -> f64 {
    let vol = compute_annual_vol(daily_returns);
    if vol.is_nan() || vol <= f64::EPSILON {
        return f64::NAN;
    }
    (mean(daily_returns) * TRADING_DAYS_PER_YEAR - risk_free_annual) / vol
}

/// Annualized Sortino ratio.
///
/// Downside deviation is `sqrt(mean(min(r, 0)^2)) * sqrt(252)` over all
/// finite observations.
#[must_use]
pub fn compute_sortino(daily_returns: &[f64], risk_free_annual: f64) -> f64 {
    let finite = finite_values(daily_returns);
    if finite.is_empty() {
        return f64::NAN;
    }
    let downside_sq = finite.iter().map(|r| r.min(0.0).powi(2)).sum::<f64>() / finite.len() as f64;
    let downside = downside_sq.sqrt() * TRADING_DAYS_PER_YEAR.sqrt();
    if downside <= f64::EPSILON {
        return f64::NAN;
    }
    (mean(&finite) * TRADING_DAYS_PER_YEAR - risk_free_annual) / downside
}

/// Compounds daily returns into a wealth curve starting from the first return.
///
/// NaN returns are treated as flat days.
#[must_use]
pub fn equity_from_returns(daily_returns: &[f64]) -> Vec<f64> {
    daily_returns
        .iter()
        .scan(1.0, |wealth, r| {
            if r.is_finite() {
                *wealth *= 1.0 + r;
            }
            Some(*wealth)
        })
        .collect()
}

/// Drawdown from the running peak at every point (`equity / peak - 1`, so <= 0).
#[must_use]
pub fn compute_drawdown_series(equity: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity
        .iter()
        .map(|&e| {
            if e.is_finite() {
                peak = peak.max(e);
            }
            if peak.is_finite() && peak > 0.0 { e / peak - 1.0 } else { f64::NAN }
        })
        .collect()
}

/// Largest peak-to-trough loss as a positive magnitude.
///
/// # Examples
///
/// ```
/// use caduceus_eval::metrics::compute_max_drawdown;
///
/// let equity = [1.0, 1.2, 0.9, 1.1];
/// assert!((compute_max_drawdown(&equity) - 0.25).abs() < 1e-12);
/// ```
#[must_use]
pub fn compute_max_drawdown(equity: &[f64]) -> f64 {
    let worst = compute_drawdown_series(equity)
        .into_iter()
        .filter(|d| d.is_finite())
        .fold(f64::NAN, f64::min);
    worst.abs()
}

/// CAGR divided by the maximum drawdown of the compounded returns.
#[must_use]
pub fn compute_calmar(daily_returns: &[f64]) -> f64 {
    let mdd = compute_max_drawdown(&equity_from_returns(daily_returns));
    if mdd.is_nan() || mdd <= f64::EPSILON {
        return f64::NAN;
    }
    compute_cagr(daily_returns) / mdd
}

/// Bias-corrected sample skewness.
///
/// NaN with fewer than three finite observations or zero variance.
#[must_use]
pub fn compute_skew(returns: &[f64]) -> f64 {
    let x = finite_values(returns);
    let n = x.len();
    if n < 3 {
        return f64::NAN;
    }
    let nf = n as f64;
    let m = x.iter().sum::<f64>() / nf;
    let m2 = x.iter().map(|v| (v - m).powi(2)).sum::<f64>() / nf;
    let m3 = x.iter().map(|v| (v - m).powi(3)).sum::<f64>() / nf;
    if m2 <= f64::EPSILON * f64::EPSILON {
        return f64::NAN;
    }
    (nf * (nf - 1.0)).sqrt() / (nf - 2.0) * m3 / m2.powf(1.5)
}

/// Bias-corrected sample excess kurtosis (zero for a normal distribution).
///
/// NaN with fewer than four finite observations or zero variance.
#[must_use]
pub fn compute_kurtosis(returns: &[f64]) -> f64 {
    let x = finite_values(returns);
    let n = x.len();
    if n < 4 {
        return f64::NAN;
    }
    let nf = n as f64;
    let m = x.iter().sum::<f64>() / nf;
    let s2 = x.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    let s4 = x.iter().map(|v| (v - m).powi(4)).sum::<f64>();
    if s2 <= f64::EPSILON * f64::EPSILON {
        return f64::NAN;
    }
    let numer = nf * (nf + 1.0) * (nf - 1.0) * s4;
    let denom = (nf - 2.0) * (nf - 3.0) * s2 * s2;
    let adj = 3.0 * (nf - 1.0).powi(2) / ((nf - 2.0) * (nf - 3.0));
    numer / denom - adj
}

/// Pearson correlation over pairs where both sides are finite.
#[must_use]
pub fn compute_correlation(a: &[f64], b: &[f64]) -> f64 {
    correlation(a, b)
}

/// Annualized mean active return over annualized tracking error.
///
/// Active returns are `strategy - benchmark` over pairs where both are finite.
/// Tracking error uses the sample standard deviation (ddof 1).
#[must_use]
pub fn compute_information_ratio(strategy: &[f64], benchmark: &[f64]) -> f64 {
    let active: Vec<f64> = strategy
        .iter()
        .zip(benchmark.iter())
        .filter(|(s, b)| s.is_finite() && b.is_finite())
        .map(|(s, b)| s - b)
        .collect();
    if active.len() < 2 {
        return f64::NAN;
    }
    let tracking_error = std_dev(&active, 1) * TRADING_DAYS_PER_YEAR.sqrt();
    if tracking_error.is_nan() || tracking_error <= f64::EPSILON {
        return f64::NAN;
    }
    mean(&active) * TRADING_DAYS_PER_YEAR / tracking_error
}

/// Compounds daily returns into calendar-month returns labelled by month-end.
#[must_use]
pub fn to_monthly_returns(daily: &TimeSeries) -> TimeSeries {
    let mut index = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    for (date, &r) in daily.iter() {
        let label = month_end(date);
        let r = if r.is_finite() { r } else { 0.0 };
        if index.last() == Some(&label) {
            if let Some(acc) = values.last_mut() {
                *acc = (1.0 + *acc) * (1.0 + r) - 1.0;
            }
        } else {
            index.push(label);
            values.push(r);
        }
    }
    // Month-end labels of a strictly increasing index are themselves increasing.
    TimeSeries::new(index, values).unwrap_or_else(|_| TimeSeries::empty())
}

/// Monthly returns of both series over their common dates, paired by month.
fn paired_monthly(strategy: &TimeSeries, benchmark: &TimeSeries) -> Vec<(f64, f64)> {
    let common_strategy = strategy.filter_dates(|d| benchmark.get(d).is_some());
    let common_benchmark = benchmark.filter_dates(|d| strategy.get(d).is_some());
    let s = to_monthly_returns(&common_strategy);
    let b = to_monthly_returns(&common_benchmark);
    s.values().iter().copied().zip(b.values().iter().copied()).collect()
}

fn capture(strategy: &TimeSeries, benchmark: &TimeSeries, up: bool) -> f64 {
    let months: Vec<(f64, f64)> = paired_monthly(strategy, benchmark)
        .into_iter()
        .filter(|(_, b)| if up { *b > 0.0 } else { *b < 0.0 })
        .collect();
    if months.is_empty() {
        return f64::NAN;
    }
    let n = months.len() as f64;
    let strat_mean = months.iter().map(|m| m.0).sum::<f64>() / n;
    let bench_mean = months.iter().map(|m| m.1).sum::<f64>() / n;
    if bench_mean.abs() <= f64::EPSILON {
        return f64::NAN;
    }
    strat_mean / bench_mean
}

/// Mean strategy monthly return over mean benchmark return in benchmark up months.
#[must_use]
pub fn compute_up_capture(strategy: &TimeSeries, benchmark: &TimeSeries) -> f64 {
    capture(strategy, benchmark, true)
}

/// Mean strategy monthly return over mean benchmark return in benchmark down months.
#[must_use]
pub fn compute_down_capture(strategy: &TimeSeries, benchmark: &TimeSeries) -> f64 {
    capture(strategy, benchmark, false)
}

/// Headline statistics of a daily return stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Compound annual growth rate
    pub cagr: f64,
    /// Annualized volatility
    pub annual_vol: f64,
    /// Annualized Sharpe ratio
    pub sharpe: f64,
    /// Annualized Sortino ratio
    pub sortino: f64,
    /// CAGR over max drawdown
    pub calmar: f64,
    /// Maximum drawdown (positive)
    pub max_drawdown: f64,
    /// Sample skewness
    pub skew: f64,
    /// Sample excess kurtosis
    pub kurtosis: f64,
}

impl PerformanceSummary {
    /// Computes every metric for `daily_returns` against `risk_free_annual`.
    #[must_use]
    pub fn from_returns(daily_returns: &[f64], risk_free_annual: f64) -> Self {
        Self {
            cagr: compute_cagr(daily_returns),
            annual_vol: compute_annual_vol(daily_returns),
            sharpe: compute_sharpe(daily_returns, risk_free_annual),
            sortino: compute_sortino(daily_returns, risk_free_annual),
            calmar: compute_calmar(daily_returns),
            max_drawdown: compute_max_drawdown(&equity_from_returns(daily_returns)),
            skew: compute_skew(daily_returns),
            kurtosis: compute_kurtosis(daily_returns),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use caduceus_traits::Date;

    fn daily(start: (i32, u32, u32), values: Vec<f64>) -> TimeSeries {
        let start = Date::from_ymd_opt(start.0, start.1, start.2).unwrap();
        let index = (0..values.len() as u64).map(|i| start + chrono::Days::new(i)).collect();
        TimeSeries::new(index, values).unwrap()
    }

    #[test]
    fn test_cagr() {
        let returns = vec![0.001; 252];
        assert_relative_eq!(compute_cagr(&returns), 1.001_f64.powi(252) - 1.0, epsilon = 1e-12);
        assert!(compute_cagr(&[]).is_nan());
    }

    #[test]
    fn test_vol_and_sharpe() {
        let returns = [0.01, -0.01, 0.01, -0.01];
        assert_relative_eq!(compute_annual_vol(&returns), 0.01 * 252_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(compute_sharpe(&returns, 0.0), 0.0, epsilon = 1e-12);

        let returns = [0.02, 0.0, 0.02, 0.0];
        let expected = (0.01 * 252.0 - 0.02) / (0.01 * 252_f64.sqrt());
        assert_relative_eq!(compute_sharpe(&returns, 0.02), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_sharpe_zero_vol_is_nan() {
        assert!(compute_sharpe(&[0.001; 10], 0.0).is_nan());
        assert!(compute_sharpe(&[], 0.0).is_nan());
    }

    #[test]
    fn test_sortino() {
        let returns = [0.02, -0.01, 0.02, -0.01];
        let downside = (0.0002_f64 / 4.0).sqrt() * 252_f64.sqrt();
        assert_relative_eq!(compute_sortino(&returns, 0.0), 0.005 * 252.0 / downside, epsilon = 1e-12);
        assert!(compute_sortino(&[0.01, 0.02], 0.0).is_nan());
    }

    #[test]
    fn test_drawdown() {
        let equity = [1.0, 1.2, 0.9, 1.3, 1.04];
        let dd = compute_drawdown_series(&equity);
        assert_eq!(dd[1], 0.0);
        assert_relative_eq!(dd[2], -0.25, epsilon = 1e-12);
        assert_relative_eq!(dd[4], -0.2, epsilon = 1e-12);
        assert_relative_eq!(compute_max_drawdown(&equity), 0.25, epsilon = 1e-12);
        assert!(compute_max_drawdown(&[]).is_nan());
        assert_eq!(compute_max_drawdown(&[1.0, 1.1, 1.2]), 0.0);
    }

    #[test]
    fn test_calmar() {
        let returns = [0.1, -0.5, 0.2];
        let expected = compute_cagr(&returns) / 0.5;
        assert_relative_eq!(compute_calmar(&returns), expected, epsilon = 1e-12);
        assert!(compute_calmar(&[0.01, 0.01]).is_nan());
    }

    #[test]
    fn test_skew_and_kurtosis() {
        // Symmetric sample has zero skew.
        assert_relative_eq!(compute_skew(&[-2.0, -1.0, 0.0, 1.0, 2.0]), 0.0, epsilon = 1e-12);
        // [1, 2, 3, 10]: skew 1.763633, excess kurtosis 3.228.
        let x = [1.0, 2.0, 3.0, 10.0];
        assert_relative_eq!(compute_skew(&x), 1.763_633, epsilon = 1e-5);
        assert_relative_eq!(compute_kurtosis(&x), 3.228, epsilon = 1e-9);
        assert!(compute_skew(&[1.0, 2.0]).is_nan());
        assert!(compute_kurtosis(&[1.0, 2.0, 3.0]).is_nan());
        assert!(compute_skew(&[1.0, 1.0, 1.0]).is_nan());
    }

    #[test]
    fn test_information_ratio() {
        let strategy = [0.02, 0.01, 0.03];
        let benchmark = [0.01, 0.01, 0.01];
        // Active [0.01, 0, 0.02]: mean 0.01, sample std 0.01.
        let expected = 0.01 * 252.0 / (0.01 * 252_f64.sqrt());
        assert_relative_eq!(compute_information_ratio(&strategy, &benchmark), expected, epsilon = 1e-9);
        assert!(compute_information_ratio(&[0.01], &[0.0]).is_nan());
        assert!(compute_information_ratio(&[0.01, 0.02], &[0.0, 0.01]).is_nan());
    }

    #[test]
    fn test_correlation() {
        assert_relative_eq!(compute_correlation(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]), 1.0, epsilon = 1e-12);
        assert!(compute_correlation(&[1.0], &[1.0]).is_nan());
    }

    #[test]
    fn test_monthly_returns() {
        // 2020-01-30 .. 2020-02-02: two January days, two February days.
        let series = daily((2020, 1, 30), vec![0.1, 0.1, 0.1, -0.5]);
        let monthly = to_monthly_returns(&series);
        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly.index()[0], Date::from_ymd_opt(2020, 1, 31).unwrap());
        assert_relative_eq!(monthly.values()[0], 0.21, epsilon = 1e-12);
        assert_relative_eq!(monthly.values()[1], -0.45, epsilon = 1e-12);
    }

    #[test]
    fn test_capture_ratios() {
        // Month one: benchmark +10%, strategy +5%. Month two: benchmark -10%, strategy -2%.
        let bench = daily((2020, 1, 31), vec![0.1, -0.1]);
        let strat = daily((2020, 1, 31), vec![0.05, -0.02]);
        assert_relative_eq!(compute_up_capture(&strat, &bench), 0.5, epsilon = 1e-12);
        assert_relative_eq!(compute_down_capture(&strat, &bench), 0.2, epsilon = 1e-12);
        let flat = daily((2020, 1, 31), vec![0.0, 0.0]);
        assert!(compute_up_capture(&strat, &flat).is_nan());
    }

    #[test]
    fn test_summary() {
        let returns = [0.01, -0.02, 0.015, 0.0, 0.005];
        let summary = PerformanceSummary::from_returns(&returns, 0.0);
        assert_relative_eq!(summary.cagr, compute_cagr(&returns));
        assert_relative_eq!(summary.sharpe, compute_sharpe(&returns, 0.0));
        assert_relative_eq!(summary.max_drawdown, 0.02, epsilon = 1e-12);
        assert!(summary.kurtosis.is_finite());
    }
}
