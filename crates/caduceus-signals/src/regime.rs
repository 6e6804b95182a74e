//! Macro regime classification.
//!
//! Three month-end features drive the label: the change in a rate series, the
//! trailing return of an equity index, and the average level of a volatility
//! index. A month is risk-on only when rates are not rising, the index is not
//! falling and volatility is contained; anything else (including missing
//! data) is risk-off.

use std::fmt;

use caduceus_traits::{
    CaduceusError, Date, Panel, Result, TimeSeries, ensure_positive, month_ends_between,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

const RATE_PREFIX: &str = "delta_rate_";
const SPY_PREFIX: &str = "spy_return_";
const VIX_PREFIX: &str = "vix_mean_";

/// Monthly macro regime label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Defensive month (label 0).
    RiskOff = 0,
    /// Risk-taking month (label 1).
    RiskOn = 1,
}

impl Regime {
    /// True for [`Regime::RiskOn`].
    #[must_use]
    pub const fn is_risk_on(self) -> bool {
        matches!(self, Self::RiskOn)
    }

    /// Numeric label: 1 for risk-on, 0 for risk-off.
    #[must_use]
    pub const fn label(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RiskOff => write!(f, "risk_off"),
            Self::RiskOn => write!(f, "risk_on"),
        }
    }
}

/// Lookback windows for the monthly feature table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeFeatureConfig {
    /// Months over which the rate change is measured (default: 6)
    pub lookback_months_rate: usize,

    /// Months over which the index return is measured (default: 6)
    pub lookback_months_spy: usize,

    /// Months averaged for the volatility index (default: 1)
    pub vix_window_months: usize,
}

impl Default for RegimeFeatureConfig {
    fn default() -> Self {
        Self {
            lookback_months_rate: 6,
            lookback_months_spy: 6,
            vix_window_months: 1,
        }
    }
}

impl RegimeFeatureConfig {
    /// Builds the feature table from raw series with these lookbacks.
    ///
    /// # Errors
    ///
    /// Fails if a lookback is zero.
    pub fn compute(
        &self,
        rate: &TimeSeries,
        index_price: &TimeSeries,
        vol_index: &TimeSeries,
    ) -> Result<Panel> {
        compute_monthly_features(
            rate,
            index_price,
            vol_index,
            self.lookback_months_rate,
            self.lookback_months_spy,
            self.vix_window_months,
        )
    }
}

/// Values of `series` on the month-end `grid`, NaN where it has no entry.
fn align_to_grid(series: &TimeSeries, grid: &[Date]) -> Vec<f64> {
    grid.iter()
        .map(|&d| series.get(d).copied().unwrap_or(f64::NAN))
        .collect()
}

/// Month-end macro feature table.
///
/// The rate and index price are sampled at the last observation of each
/// month, the volatility index at its monthly mean. The columns are
/// `delta_rate_{N}m` (rate difference over N months), `spy_return_{M}m`
/// (percent change over M months) and `vix_mean_{W}m` (rolling mean over W
/// months, defined only when all W months are present). The index spans
/// every month covered by any input; rows where all three features are
/// missing are dropped.
///
/// # Errors
///
/// Fails if any lookback is zero.
pub fn compute_monthly_features(
    rate: &TimeSeries,
    index_price: &TimeSeries,
    vol_index: &TimeSeries,
    lookback_months_rate: usize,
    lookback_months_spy: usize,
    vix_window_months: usize,
) -> Result<Panel> {
    ensure_positive("lookback_months_rate", lookback_months_rate)?;
    ensure_positive("lookback_months_spy", lookback_months_spy)?;
    ensure_positive("vix_window_months", vix_window_months)?;

    let delta_rate = rate.resample_month_end_last().diff(lookback_months_rate);
    let spy_return = index_price
        .resample_month_end_last()
        .pct_change(lookback_months_spy);
    let vix_mean = vol_index
        .resample_month_end_mean()
        .rolling_mean(vix_window_months);

    let columns = vec![
        format!("{RATE_PREFIX}{lookback_months_rate}m"),
        format!("{SPY_PREFIX}{lookback_months_spy}m"),
        format!("{VIX_PREFIX}{vix_window_months}m"),
    ];

    let features = [&delta_rate, &spy_return, &vix_mean];
    let first = features.iter().filter_map(|s| s.index().first()).min();
    let last = features.iter().filter_map(|s| s.index().last()).max();
    let grid = match (first, last) {
        (Some(&first), Some(&last)) => month_ends_between(first, last),
        _ => Vec::new(),
    };

    let aligned: Vec<Vec<f64>> = features.iter().map(|s| align_to_grid(s, &grid)).collect();
    let keep: Vec<usize> = (0..grid.len())
        .filter(|&i| aligned.iter().any(|col| !col[i].is_nan()))
        .collect();

    let index = keep.iter().map(|&i| grid[i]).collect();
    let values = Array2::from_shape_fn((keep.len(), columns.len()), |(r, c)| aligned[c][keep[r]]);
    Panel::new(index, columns, values)
}

/// Threshold set for [`classify_regime`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeThresholds {
    /// Maximum rate change for risk-on (default: 0.0)
    pub rate_threshold: f64,

    /// Maximum average volatility index level for risk-on (default: 25.0)
    pub vix_threshold: f64,

    /// Minimum index return for risk-on (default: 0.0)
    pub spy_ret_threshold: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            rate_threshold: 0.0,
            vix_threshold: 25.0,
            spy_ret_threshold: 0.0,
        }
    }
}

impl RegimeThresholds {
    /// Create a threshold set.
    #[must_use]
    pub const fn new(rate_threshold: f64, vix_threshold: f64, spy_ret_threshold: f64) -> Self {
        Self {
            rate_threshold,
            vix_threshold,
            spy_ret_threshold,
        }
    }

    /// Applies the rule to one month of features. Any NaN yields risk-off.
    #[must_use]
    pub fn classify(&self, delta_rate: f64, spy_return: f64, vix_mean: f64) -> Regime {
        if delta_rate <= self.rate_threshold
            && spy_return >= self.spy_ret_threshold
            && vix_mean <= self.vix_threshold
        {
            Regime::RiskOn
        } else {
            Regime::RiskOff
        }
    }
}

/// Which feature-table columns feed the classifier.
///
/// Unset entries are resolved from the table: a unique column with the
/// feature's prefix, else the conventional default name, else the
/// lexicographically first prefixed column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumns {
    /// Rate-change column
    pub rate: Option<String>,

    /// Index-return column
    pub spy: Option<String>,

    /// Volatility-mean column
    pub vix: Option<String>,
}

fn resolve_column(
    features: &Panel,
    explicit: Option<&str>,
    prefix: &str,
    fallback: &str,
) -> Result<usize> {
    if let Some(name) = explicit {
        return features.column_position(name).ok_or_else(|| {
            CaduceusError::MissingColumn(format!("feature column '{name}' not in table"))
        });
    }
    let mut matches: Vec<(usize, &str)> = features
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.starts_with(prefix))
        .map(|(i, c)| (i, c.as_str()))
        .collect();
    if let [(only, _)] = matches.as_slice() {
        return Ok(*only);
    }
    if let Some(pos) = features.column_position(fallback) {
        return Ok(pos);
    }
    matches.sort_by(|a, b| a.1.cmp(b.1));
    matches.first().map(|(i, _)| *i).ok_or_else(|| {
        CaduceusError::MissingColumn(format!("no feature column with prefix '{prefix}'"))
    })
}

impl FeatureColumns {
    /// Column positions of (rate, spy, vix) in `features`.
    ///
    /// # Errors
    ///
    /// Returns [`CaduceusError::MissingColumn`] if an explicit column is
    /// absent or nothing matches a feature's prefix.
    pub fn resolve(&self, features: &Panel) -> Result<(usize, usize, usize)> {
        Ok((
            resolve_column(features, self.rate.as_deref(), RATE_PREFIX, "delta_rate_6m")?,
            resolve_column(features, self.spy.as_deref(), SPY_PREFIX, "spy_return_6m")?,
            resolve_column(features, self.vix.as_deref(), VIX_PREFIX, "vix_mean_1m")?,
        ))
    }
}

/// Labels each month of a feature table.
///
/// # Errors
///
/// Fails if the feature columns cannot be resolved.
pub fn classify_regime(
    features: &Panel,
    thresholds: &RegimeThresholds,
    columns: &FeatureColumns,
) -> Result<TimeSeries<Regime>> {
    let (rate_col, spy_col, vix_col) = columns.resolve(features)?;
    let labels: Vec<Regime> = (0..features.n_rows())
        .map(|i| {
            thresholds.classify(
                features.value(i, rate_col),
                features.value(i, spy_col),
                features.value(i, vix_col),
            )
        })
        .collect();
    let series = TimeSeries::new(features.index().to_vec(), labels)?;
    debug!(
        months = series.len(),
        risk_on = risk_on_fraction(&series),
        "classified regimes"
    );
    Ok(series)
}

/// Share of months labelled risk-on, NaN for an empty series.
#[must_use]
pub fn risk_on_fraction(labels: &TimeSeries<Regime>) -> f64 {
    if labels.is_empty() {
        return f64::NAN;
    }
    let on = labels.values().iter().filter(|r| r.is_risk_on()).count();
    on as f64 / labels.len() as f64
}

/// Feature lookbacks, thresholds and column choice bundled together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeModel {
    /// Feature lookbacks
    pub features: RegimeFeatureConfig,

    /// Classification thresholds
    pub thresholds: RegimeThresholds,

    /// Feature column mapping
    pub columns: FeatureColumns,
}

impl RegimeModel {
    /// Computes features from raw macro series and labels every month.
    ///
    /// # Errors
    ///
    /// Fails on invalid lookbacks or unresolvable feature columns.
    pub fn classify(
        &self,
        rate: &TimeSeries,
        index_price: &TimeSeries,
        vol_index: &TimeSeries,
    ) -> Result<TimeSeries<Regime>> {
        let features = self.features.compute(rate, index_price, vol_index)?;
        classify_regime(&features, &self.thresholds, &self.columns)
    }
}
