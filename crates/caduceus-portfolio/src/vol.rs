//! Volatility estimation, inverse-volatility weighting and vol targeting.

use caduceus_traits::stats::TRADING_DAYS_PER_YEAR;
use caduceus_traits::{CaduceusError, Panel, Result, ensure_positive};
use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::weights::cap_gross;

/// Configuration for rolling volatility estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolEstimator {
    /// Rolling window length in trading days
    pub lookback_days: usize,

    /// Minimum finite observations in the window before a value is reported.
    /// With 1, the earliest estimates rest on very few returns.
    pub min_periods: usize,
}

impl Default for VolEstimator {
    fn default() -> Self {
        Self {
            lookback_days: 60,
            min_periods: 1,
        }
    }
}

impl VolEstimator {
    /// Create an estimator, validating the window parameters.
    ///
    /// # Errors
    ///
    /// Fails if either parameter is zero or `min_periods > lookback_days`.
    pub fn new(lookback_days: usize, min_periods: usize) -> Result<Self> {
        let estimator = Self {
            lookback_days,
            min_periods,
        };
        estimator.validate()?;
        Ok(estimator)
    }

    /// Check the window parameters.
    ///
    /// # Errors
    ///
    /// Fails if either parameter is zero or `min_periods > lookback_days`.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("vol lookback_days", self.lookback_days)?;
        ensure_positive("vol min_periods", self.min_periods)?;
        if self.min_periods > self.lookback_days {
            return Err(CaduceusError::InvalidParameter(format!(
                "vol min_periods ({}) exceeds lookback_days ({})",
                self.min_periods, self.lookback_days
            )));
        }
        Ok(())
    }

    /// Annualized rolling volatility of each column of `returns`.
    ///
    /// Each cell is the population standard deviation (ddof 0) of the finite
    /// returns in the trailing window ending on that row, times √252. Rows
    /// whose window holds fewer than `min_periods` finite returns are NaN.
    ///
    /// # Errors
    ///
    /// Fails if the estimator parameters are invalid.
    pub fn estimate(&self, returns: &Panel) -> Result<Panel> {
        self.validate()?;
        let mut vols = Array2::from_elem(returns.values().dim(), f64::NAN);
        Zip::from(returns.values().columns())
            .and(vols.columns_mut())
            .for_each(|column, out| self.estimate_column(column, out));
        Panel::new(returns.index().to_vec(), returns.columns().to_vec(), vols)
    }

    fn estimate_column(&self, returns: ArrayView1<'_, f64>, mut out: ArrayViewMut1<'_, f64>) {
        let annualizer = TRADING_DAYS_PER_YEAR.sqrt();
        let mut window = RollingMoments::default();
        for i in 0..returns.len() {
            if i >= self.lookback_days {
                window.remove(returns[i - self.lookback_days]);
            }
            window.push(returns[i]);
            if window.count >= self.min_periods {
                out[i] = window.population_std() * annualizer;
            }
        }
    }
}

/// Running mean and sum of squared deviations over the finite values of a
/// sliding window.
#[derive(Debug, Default)]
struct RollingMoments {
    count: usize,
    mean: f64,
    m2: f64,
}

impl RollingMoments {
    fn push(&mut self, x: f64) {
        if !x.is_finite() {
            return;
        }
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn remove(&mut self, x: f64) {
        if !x.is_finite() || self.count == 0 {
            return;
        }
        if self.count == 1 {
            *self = Self::default();
            return;
        }
        self.count -= 1;
        let delta = x - self.mean;
        self.mean -= delta / self.count as f64;
        self.m2 -= delta * (x - self.mean);
    }

    fn population_std(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        (self.m2.max(0.0) / self.count as f64).sqrt()
    }
}

/// Annualized rolling volatility with the given estimator.
///
/// # Errors
///
/// Fails if the estimator parameters are invalid.
pub fn estimate_rolling_vol(returns: &Panel, estimator: &VolEstimator) -> Result<Panel> {
    estimator.estimate(returns)
}

/// Inverse-volatility weights normalized to sum to one.
///
/// Entries with a missing or non-positive volatility get weight zero and are
/// excluded from the normalization. Returns `None` when no entry is usable or
/// the inverse volatilities do not sum to a finite positive number.
///
/// # Example
///
/// ```
/// use caduceus_portfolio::inverse_vol_weights;
/// use ndarray::array;
///
/// let w = inverse_vol_weights(&array![0.1, 0.2, f64::NAN]).unwrap();
/// assert!((w[0] - 2.0 / 3.0).abs() < 1e-12);
/// assert_eq!(w[2], 0.0);
/// ```
#[must_use]
pub fn inverse_vol_weights(vols: &Array1<f64>) -> Option<Array1<f64>> {
    let inv = vols.mapv(|v| if v.is_finite() && v > 0.0 { 1.0 / v } else { 0.0 });
    let total = inv.sum();
    if !total.is_finite() || total <= 0.0 || inv.iter().any(|x| !x.is_finite()) {
        return None;
    }
    Some(inv / total)
}

/// Scale risk weights so the portfolio hits a target annual volatility.
///
/// Portfolio volatility assumes zero cross-asset correlation,
/// `sqrt(sum(w_i^2 * vol_i^2))`, over the entries with non-zero weight. After
/// scaling, gross exposure is capped at `max_gross_leverage` by proportional
/// scale-down. A degenerate portfolio volatility (zero or non-finite) yields
/// all-zero weights.
///
/// # Errors
///
/// Fails if `target_vol_annual` is negative or non-finite, if
/// `max_gross_leverage` is not positive, or if the inputs differ in length.
pub fn scale_weights_to_target_vol(
    risk_weights: &Array1<f64>,
    vols: &Array1<f64>,
    target_vol_annual: f64,
    max_gross_leverage: f64,
) -> Result<Array1<f64>> {
    if !target_vol_annual.is_finite() || target_vol_annual < 0.0 {
        return Err(CaduceusError::InvalidParameter(format!(
            "target_vol_annual must be a non-negative number, got {target_vol_annual}"
        )));
    }
    if max_gross_leverage.is_nan() || max_gross_leverage <= 0.0 {
        return Err(CaduceusError::InvalidParameter(format!(
            "max_gross_leverage must be positive, got {max_gross_leverage}"
        )));
    }
    if risk_weights.len() != vols.len() {
        return Err(CaduceusError::Alignment(format!(
            "{} risk weights but {} volatilities",
            risk_weights.len(),
            vols.len()
        )));
    }

    let variance: f64 = risk_weights
        .iter()
        .zip(vols.iter())
        .filter(|(w, _)| **w != 0.0)
        .map(|(w, v)| w * w * v * v)
        .sum();
    let port_vol = variance.sqrt();
    if !port_vol.is_finite() || port_vol <= 0.0 {
        debug!(port_vol, "degenerate portfolio volatility, holding flat");
        return Ok(Array1::zeros(risk_weights.len()));
    }

    let scaled = risk_weights * (target_vol_annual / port_vol);
    Ok(cap_gross(scaled, max_gross_leverage))
}
