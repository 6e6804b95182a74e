//! Month-end momentum primitives.
//!
//! All functions take month-end price panels (see
//! [`Panel::resample_month_end_last`]) and return panels with the same index
//! and columns. A value at month `t` is what a trader could know at the close
//! of month `t` and act on for the following month.

use caduceus_traits::{Panel, Result, ensure_positive};
use serde::{Deserialize, Serialize};

/// `P(t - skip) / P(t - periods) - 1` per cell, NaN where history is short.
fn trailing_return(monthly_prices: &Panel, periods: usize, skip: usize) -> Panel {
    let values = monthly_prices.values();
    monthly_prices.map_cells(|i, j, _| {
        if i < periods {
            return f64::NAN;
        }
        values[[i - skip, j]] / values[[i - periods, j]] - 1.0
    })
}

/// How the rotation strategy scores assets cross-sectionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MomentumScore {
    /// Return from twelve months ago to one month ago.
    TwelveMinusOne,
    /// Simple lookback return, shifted one month.
    Lookback {
        /// Lookback length in months
        months: usize,
    },
}

impl MomentumScore {
    /// Scores every cell of a month-end price panel.
    ///
    /// # Errors
    ///
    /// Fails if a lookback of zero months is configured.
    pub fn compute(&self, monthly_prices: &Panel) -> Result<Panel> {
        match *self {
            Self::TwelveMinusOne => Ok(compute_12m_1m_momentum(monthly_prices)),
            Self::Lookback { months } => compute_momentum_signal(monthly_prices, months),
        }
    }
}

/// Month-end simple returns of a daily price panel.
///
/// The first month is NaN.
#[must_use]
pub fn compute_monthly_total_return(prices: &Panel) -> Panel {
    trailing_return(&prices.resample_month_end_last(), 1, 0)
}

/// Lookback momentum shifted one month.
///
/// The value at month `t` is `P(t-1) / P(t-1-lookback) - 1`, so the first
/// `lookback_months + 1` months are NaN.
///
/// # Errors
///
/// Fails if `lookback_months` is zero.
///
/// # Example
///
/// ```
/// use caduceus_signals::momentum::compute_momentum_signal;
/// use caduceus_traits::{Date, Panel};
///
/// let index = vec![
///     Date::from_ymd_opt(2020, 1, 31).unwrap(),
///     Date::from_ymd_opt(2020, 2, 29).unwrap(),
///     Date::from_ymd_opt(2020, 3, 31).unwrap(),
/// ];
/// let prices = Panel::from_columns(index, vec![("XBI".into(), vec![100.0, 110.0, 121.0])])?;
/// let mom = compute_momentum_signal(&prices, 1)?;
/// assert!(mom.value(1, 0).is_nan());
/// assert!((mom.value(2, 0) - 0.10).abs() < 1e-12);
/// # Ok::<(), caduceus_traits::CaduceusError>(())
/// ```
pub fn compute_momentum_signal(monthly_prices: &Panel, lookback_months: usize) -> Result<Panel> {
    ensure_positive("lookback_months", lookback_months)?;
    Ok(trailing_return(monthly_prices, lookback_months, 0).shift(1))
}

/// Twelve-minus-one momentum: `P(t-1) / P(t-12) - 1`.
///
/// Skipping the latest month already keeps month `t`'s own return out of the
/// score, so no further shift is applied.
#[must_use]
pub fn compute_12m_1m_momentum(monthly_prices: &Panel) -> Panel {
    trailing_return(monthly_prices, 12, 1)
}

/// Time-series momentum flag: 1.0 where the shifted `lookback_months` return
/// is positive, 0.0 otherwise (including missing history).
///
/// # Errors
///
/// Fails if `lookback_months` is zero.
pub fn compute_ts_momentum_flag(monthly_prices: &Panel, lookback_months: usize) -> Result<Panel> {
    let momentum = compute_momentum_signal(monthly_prices, lookback_months)?;
    Ok(momentum.map_cells(|_, _, v| if v > 0.0 { 1.0 } else { 0.0 }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use caduceus_traits::{Date, month_ends_between};

    fn monthly(values: Vec<f64>) -> Panel {
        let first = Date::from_ymd_opt(2020, 1, 31).unwrap();
        let last = Date::from_ymd_opt(2030, 12, 31).unwrap();
        let index: Vec<Date> = month_ends_between(first, last)
            .into_iter()
            .take(values.len())
            .collect();
        Panel::from_columns(index, vec![("XBI".into(), values)]).unwrap()
    }

    #[test]
    fn test_momentum_signal_is_shifted_one_period() {
        let prices = monthly(vec![100.0, 110.0, 121.0]);
        let mom = compute_momentum_signal(&prices, 1).unwrap();
        assert!(mom.value(0, 0).is_nan());
        assert!(mom.value(1, 0).is_nan());
        assert_relative_eq!(mom.value(2, 0), 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_momentum_shift_law() {
        let prices = monthly((0..10).map(|i| 100.0 + f64::from(i)).collect());
        let mom = compute_momentum_signal(&prices, 3).unwrap();
        for i in 0..4 {
            assert!(mom.value(i, 0).is_nan());
        }
        for i in 4..10 {
            let expected = prices.value(i - 1, 0) / prices.value(i - 4, 0) - 1.0;
            assert_relative_eq!(mom.value(i, 0), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zero_lookback_rejected() {
        let prices = monthly(vec![100.0, 110.0]);
        assert!(compute_momentum_signal(&prices, 0).is_err());
        assert!(compute_ts_momentum_flag(&prices, 0).is_err());
    }

    #[test]
    fn test_12m_1m_momentum() {
        let prices = monthly((0..14).map(|i| 100.0 * 1.01f64.powi(i)).collect());
        let mom = compute_12m_1m_momentum(&prices);
        assert!(mom.value(11, 0).is_nan());
        // P(11) / P(0) - 1
        assert_relative_eq!(mom.value(12, 0), 1.01f64.powi(11) - 1.0, epsilon = 1e-12);
        assert_relative_eq!(mom.value(13, 0), 1.01f64.powi(11) - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ts_flag() {
        let prices = monthly(vec![100.0, 110.0, 100.0, 90.0]);
        let flag = compute_ts_momentum_flag(&prices, 1).unwrap();
        assert_eq!(flag.column("XBI").unwrap().to_vec(), vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_momentum_score_dispatch() {
        let prices = monthly(vec![100.0, 110.0, 121.0]);
        let via_enum = MomentumScore::Lookback { months: 1 }.compute(&prices).unwrap();
        let direct = compute_momentum_signal(&prices, 1).unwrap();
        assert_relative_eq!(via_enum.value(2, 0), direct.value(2, 0));
        assert!(MomentumScore::Lookback { months: 0 }.compute(&prices).is_err());
    }

    #[test]
    fn test_monthly_total_return() {
        let index = vec![
            Date::from_ymd_opt(2020, 1, 30).unwrap(),
            Date::from_ymd_opt(2020, 1, 31).unwrap(),
            Date::from_ymd_opt(2020, 2, 28).unwrap(),
        ];
        let prices = Panel::from_columns(index, vec![("A".into(), vec![90.0, 100.0, 105.0])]).unwrap();
        let ret = compute_monthly_total_return(&prices);
        assert_eq!(ret.n_rows(), 2);
        assert!(ret.value(0, 0).is_nan());
        assert_relative_eq!(ret.value(1, 0), 0.05, epsilon = 1e-12);
    }
}
