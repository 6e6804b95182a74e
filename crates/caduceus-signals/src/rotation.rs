//! Momentum rotation across the healthcare ETF universe.
//!
//! Each month-end the strategy ranks the universe by momentum, keeps the top
//! `top_k` names with positive scores (optionally only those with positive
//! own-trend), sizes them by inverse volatility and scales the book to a
//! target volatility under a gross-leverage cap. A sector trend filter and a
//! defensive fallback handle bear markets.

use caduceus_portfolio::{
    MonthlySchedule, VolEstimator, cap_gross_leverage, inverse_vol_weights,
    scale_weights_to_target_vol,
};
use caduceus_traits::{
    CaduceusError, Date, Panel, PricePanel, Result, Ticker, TimeSeries, WeightBuilder,
    WeightSchedule, ensure_positive,
};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::momentum::{MomentumScore, compute_ts_momentum_flag};

/// Configuration for the rotation strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Candidate tickers (default: XBI, XPH, IHF, IHI, XLV)
    pub universe: Vec<Ticker>,

    /// Lookback for the simple momentum score, in months (default: 6)
    pub lookback_months: usize,

    /// Number of assets held (default: 2)
    pub top_k: usize,

    /// Target annualized portfolio volatility (default: 0.10)
    pub target_vol_annual: f64,

    /// Score with 12-minus-1 momentum instead of the simple lookback (default: true)
    pub use_12m1m: bool,

    /// Require a positive own-trend return to hold an asset (default: true)
    pub use_ts_mom_gating: bool,

    /// Go to cash when the trend ticker's trailing return is not positive (default: true)
    pub use_trend_filter: bool,

    /// Ticker whose trailing return drives the trend filter (default: XLV)
    pub trend_ticker: Ticker,

    /// Trend filter lookback in months (default: 12)
    pub trend_lookback_months: usize,

    /// Own-trend gate lookback in months (default: 12)
    pub ts_lookback_months: usize,

    /// Gross exposure ceiling (default: 1.5)
    pub max_gross_leverage: f64,

    /// Ticker held when every score is non-positive (default: none, i.e. cash)
    pub defensive_ticker: Option<Ticker>,

    /// Whether the defensive fallback is active (default: true)
    pub defensive_on_negative_momentum: bool,

    /// Volatility window in trading days (default: 60)
    pub vol_lookback_days: usize,

    /// Minimum observations for a volatility estimate (default: 1)
    pub vol_min_periods: usize,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            universe: ["XBI", "XPH", "IHF", "IHI", "XLV"]
                .iter()
                .map(|t| (*t).to_string())
                .collect(),
            lookback_months: 6,
            top_k: 2,
            target_vol_annual: 0.10,
            use_12m1m: true,
            use_ts_mom_gating: true,
            use_trend_filter: true,
            trend_ticker: "XLV".to_string(),
            trend_lookback_months: 12,
            ts_lookback_months: 12,
            max_gross_leverage: 1.5,
            defensive_ticker: None,
            defensive_on_negative_momentum: true,
            vol_lookback_days: 60,
            vol_min_periods: 1,
        }
    }
}

impl RotationConfig {
    /// The cross-sectional score selected by `use_12m1m`.
    #[must_use]
    pub const fn momentum_score(&self) -> MomentumScore {
        if self.use_12m1m {
            MomentumScore::TwelveMinusOne
        } else {
            MomentumScore::Lookback {
                months: self.lookback_months,
            }
        }
    }

    /// The volatility estimator for position sizing.
    #[must_use]
    pub const fn vol_estimator(&self) -> VolEstimator {
        VolEstimator {
            lookback_days: self.vol_lookback_days,
            min_periods: self.vol_min_periods,
        }
    }

    /// Checks every parameter.
    ///
    /// # Errors
    ///
    /// Fails on a zero `top_k` or lookback, a non-positive leverage cap, a
    /// negative target volatility or invalid volatility window.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("top_k", self.top_k)?;
        ensure_positive("lookback_months", self.lookback_months)?;
        ensure_positive("ts_lookback_months", self.ts_lookback_months)?;
        ensure_positive("trend_lookback_months", self.trend_lookback_months)?;
        if self.max_gross_leverage.is_nan() || self.max_gross_leverage <= 0.0 {
            return Err(CaduceusError::InvalidParameter(format!(
                "max_gross_leverage must be positive, got {}",
                self.max_gross_leverage
            )));
        }
        if !self.target_vol_annual.is_finite() || self.target_vol_annual < 0.0 {
            return Err(CaduceusError::InvalidParameter(format!(
                "target_vol_annual must be non-negative, got {}",
                self.target_vol_annual
            )));
        }
        self.vol_estimator().validate()
    }
}

/// Month-end trailing return of the trend ticker, if the filter applies.
fn trend_returns(prices: &PricePanel, config: &RotationConfig) -> Result<Option<TimeSeries>> {
    if !config.use_trend_filter {
        return Ok(None);
    }
    if !prices.has_column(&config.trend_ticker) {
        warn!(ticker = %config.trend_ticker, "trend ticker not priced, trend filter disabled");
        return Ok(None);
    }
    let monthly = prices
        .column_series(&config.trend_ticker)?
        .resample_month_end_last()
        .pct_change(config.trend_lookback_months);
    Ok(Some(monthly))
}

/// Everything one rebalance needs, computed once for the whole history.
struct RebalanceInputs<'a> {
    universe: &'a [Ticker],
    /// Universe column `j` sits at price column `targets[j]`.
    targets: &'a [usize],
    n_cols: usize,
    scores: Panel,
    ts_flags: Option<Panel>,
    vols: Panel,
    defensive: Option<usize>,
}

impl RebalanceInputs<'_> {
    /// Target weights over the price columns for month-end row `row`.
    fn weights_for(&self, row: usize, date: Date, config: &RotationConfig) -> Result<Array1<f64>> {
        let mut weights = Array1::zeros(self.n_cols);

        let scored: Vec<(usize, f64)> = (0..self.universe.len())
            .map(|j| (j, self.scores.value(row, j)))
            .filter(|(_, s)| s.is_finite())
            .collect();
        if scored.is_empty() {
            return Ok(weights);
        }

        let best = scored.iter().map(|(_, s)| *s).fold(f64::NEG_INFINITY, f64::max);
        if best <= 0.0 {
            if let Some(col) = self.defensive {
                weights[col] = 1.0;
            }
            debug!(%date, defensive = self.defensive.is_some(), "no positive momentum");
            return Ok(weights);
        }

        let mut eligible: Vec<(usize, f64)> = scored
            .into_iter()
            .filter(|(_, s)| *s > 0.0)
            .filter(|(j, _)| {
                self.ts_flags
                    .as_ref()
                    .is_none_or(|flags| flags.value(row, *j) == 1.0)
            })
            .collect();
        if eligible.is_empty() {
            debug!(%date, "time-series gate removed every candidate");
            return Ok(weights);
        }

        eligible.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| self.universe[a.0].cmp(&self.universe[b.0]))
        });
        eligible.truncate(config.top_k);

        let Some(vol_row) = self.vols.asof_position(date) else {
            return Ok(weights);
        };
        let winner_vols: Array1<f64> = eligible
            .iter()
            .map(|(j, _)| self.vols.value(vol_row, *j))
            .collect();
        let Some(risk) = inverse_vol_weights(&winner_vols) else {
            debug!(%date, "no usable volatility for winners, holding cash");
            return Ok(weights);
        };
        let sized = scale_weights_to_target_vol(
            &risk,
            &winner_vols,
            config.target_vol_annual,
            config.max_gross_leverage,
        )?;
        for ((j, _), w) in eligible.iter().zip(sized.iter()) {
            weights[self.targets[*j]] = *w;
        }
        Ok(weights)
    }
}

/// Momentum rotation strategy.
///
/// # Example
///
/// ```no_run
/// use caduceus_signals::{RotationConfig, RotationSignal};
/// use caduceus_traits::WeightBuilder;
/// # fn load_prices() -> caduceus_traits::PricePanel { unimplemented!() }
///
/// let signal = RotationSignal::new(RotationConfig {
///     top_k: 1,
///     defensive_ticker: Some("XLV".to_string()),
///     ..RotationConfig::default()
/// });
/// let weights = signal.build(&load_prices())?;
/// # Ok::<(), caduceus_traits::CaduceusError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct RotationSignal {
    config: RotationConfig,
}

impl RotationSignal {
    /// Create a rotation signal with the given configuration.
    #[must_use]
    pub const fn new(config: RotationConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Month-end target weights over the columns of `prices`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration.
    pub fn monthly_weights(&self, prices: &PricePanel) -> Result<MonthlySchedule> {
        let config = &self.config;
        config.validate()?;

        let mut schedule = MonthlySchedule::new(prices.columns().to_vec());
        let universe: Vec<Ticker> = config
            .universe
            .iter()
            .filter(|t| {
                let priced = prices.has_column(t);
                if !priced {
                    warn!(ticker = %t, "universe member not priced, skipping");
                }
                priced
            })
            .cloned()
            .collect();
        if universe.is_empty() || prices.is_empty() {
            return Ok(schedule);
        }

        let universe_prices = prices.select(&universe)?;
        let targets: Vec<usize> = universe
            .iter()
            .filter_map(|t| prices.column_position(t))
            .collect();
        let monthly = universe_prices.resample_month_end_last();
        let inputs = RebalanceInputs {
            universe: &universe,
            targets: &targets,
            n_cols: prices.n_cols(),
            scores: config.momentum_score().compute(&monthly)?,
            ts_flags: if config.use_ts_mom_gating {
                Some(compute_ts_momentum_flag(&monthly, config.ts_lookback_months)?)
            } else {
                None
            },
            vols: config
                .vol_estimator()
                .estimate(&universe_prices.simple_returns())?,
            defensive: config
                .defensive_ticker
                .as_deref()
                .filter(|_| config.defensive_on_negative_momentum)
                .and_then(|t| prices.column_position(t)),
        };
        let trend = trend_returns(prices, config)?;

        for (i, &date) in monthly.index().iter().enumerate() {
            let trend_down = trend
                .as_ref()
                .and_then(|series| series.get(date))
                .is_some_and(|r| *r <= 0.0);
            if trend_down {
                debug!(%date, "trend filter closed, holding cash");
                schedule.push_flat(date)?;
            } else {
                schedule.push(date, inputs.weights_for(i, date, config)?)?;
            }
        }
        Ok(schedule)
    }
}

impl WeightBuilder for RotationSignal {
    fn name(&self) -> &str {
        "rotation"
    }

    fn build(&self, prices: &PricePanel) -> Result<WeightSchedule> {
        let daily = self.monthly_weights(prices)?.into_daily(prices)?;
        cap_gross_leverage(&daily, self.config.max_gross_leverage)
    }
}

/// Daily rotation weights for `prices`.
///
/// # Errors
///
/// Fails on an invalid configuration.
pub fn build_monthly_rotation_weights(
    prices: &PricePanel,
    config: &RotationConfig,
) -> Result<WeightSchedule> {
    RotationSignal::new(config.clone()).build(prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Datelike, Weekday};

    fn business_days(start: Date, end: Date) -> Vec<Date> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .collect()
    }

    fn linspace(from: f64, to: f64, n: usize) -> Vec<f64> {
        let step = (to - from) / (n - 1) as f64;
        (0..n).map(|i| from + step * i as f64).collect()
    }

    fn panel(index: Vec<Date>, cols: Vec<(&str, Vec<f64>)>) -> Panel {
        Panel::from_columns(
            index,
            cols.into_iter().map(|(n, v)| (n.to_string(), v)).collect(),
        )
        .unwrap()
    }

    fn plain_config() -> RotationConfig {
        RotationConfig {
            lookback_months: 1,
            top_k: 1,
            target_vol_annual: 0.10,
            use_12m1m: false,
            use_ts_mom_gating: false,
            use_trend_filter: false,
            ..RotationConfig::default()
        }
    }

    fn falling_prices() -> Panel {
        let dates = business_days(
            Date::from_ymd_opt(2020, 1, 1).unwrap(),
            Date::from_ymd_opt(2020, 6, 30).unwrap(),
        );
        let n = dates.len();
        panel(
            dates,
            vec![
                ("XBI", linspace(100.0, 80.0, n)),
                ("XPH", linspace(100.0, 90.0, n)),
                ("IHF", linspace(100.0, 70.0, n)),
                ("IHI", linspace(100.0, 85.0, n)),
                ("XLV", linspace(100.0, 95.0, n)),
            ],
        )
    }

    #[test]
    fn test_rotation_config_default() {
        let config = RotationConfig::default();
        assert_eq!(config.universe.len(), 5);
        assert_eq!(config.top_k, 2);
        assert_eq!(config.trend_ticker, "XLV");
        assert_eq!(config.momentum_score(), MomentumScore::TwelveMinusOne);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rotation_config_validation() {
        let bad = [
            RotationConfig {
                top_k: 0,
                ..RotationConfig::default()
            },
            RotationConfig {
                lookback_months: 0,
                ..RotationConfig::default()
            },
            RotationConfig {
                max_gross_leverage: 0.0,
                ..RotationConfig::default()
            },
            RotationConfig {
                target_vol_annual: -0.1,
                ..RotationConfig::default()
            },
            RotationConfig {
                vol_lookback_days: 0,
                ..RotationConfig::default()
            },
        ];
        for config in &bad {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn test_rotation_weights_basic_properties() {
        let dates = business_days(
            Date::from_ymd_opt(2020, 1, 1).unwrap(),
            Date::from_ymd_opt(2020, 4, 30).unwrap(),
        );
        let n = dates.len();
        let prices = panel(
            dates,
            vec![
                ("XBI", linspace(100.0, 140.0, n)),
                ("XPH", vec![100.0; n]),
                ("IHF", linspace(100.0, 90.0, n)),
                ("IHI", linspace(100.0, 110.0, n)),
                ("XLV", linspace(100.0, 105.0, n)),
            ],
        );
        let config = RotationConfig {
            max_gross_leverage: 1.5,
            ..plain_config()
        };
        let weights = build_monthly_rotation_weights(&prices, &config).unwrap();
        prices.ensure_aligned(&weights).unwrap();
        assert!(weights.row_abs_sum().iter().all(|&g| g <= 1.5 + 1e-12));

        let last = weights.row(weights.n_rows() - 1);
        let held = last.iter().filter(|w| w.abs() > 0.0).count();
        assert_eq!(held, config.top_k);
        let gross: f64 = last.iter().map(|w| w.abs()).sum();
        assert!(gross <= config.max_gross_leverage + 1e-12);
        // The strongest trend wins, and its tiny vol pushes the size to the cap.
        assert!(last[0] > 0.0);
        assert_relative_eq!(last[0], config.max_gross_leverage, epsilon = 1e-9);
    }

    #[test]
    fn test_rotation_all_cash_when_all_momentum_negative() {
        let prices = falling_prices();
        let weights = build_monthly_rotation_weights(&prices, &plain_config()).unwrap();
        let last = weights.row(weights.n_rows() - 1);
        assert_relative_eq!(last.iter().map(|w| w.abs()).sum::<f64>(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_defensive_when_all_momentum_negative() {
        let prices = falling_prices();
        let config = RotationConfig {
            defensive_ticker: Some("XLV".to_string()),
            ..plain_config()
        };
        let weights = build_monthly_rotation_weights(&prices, &config).unwrap();
        let last = weights.row(weights.n_rows() - 1);
        assert_relative_eq!(last[4], 1.0, epsilon = 1e-12);
        assert_relative_eq!(
            last.iter().take(4).map(|w| w.abs()).sum::<f64>(),
            0.0,
            epsilon = 1e-12
        );

        let disabled = RotationConfig {
            defensive_on_negative_momentum: false,
            ..config
        };
        let weights = build_monthly_rotation_weights(&prices, &disabled).unwrap();
        assert!(weights.row(weights.n_rows() - 1).iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_rotation_ties_break_by_ticker() {
        let dates = business_days(
            Date::from_ymd_opt(2020, 1, 1).unwrap(),
            Date::from_ymd_opt(2020, 4, 30).unwrap(),
        );
        let n = dates.len();
        let wiggle: Vec<f64> = (0..n)
            .map(|i| (100.0 + i as f64) * if i % 2 == 0 { 1.01 } else { 0.99 })
            .collect();
        let prices = panel(dates, vec![("IHI", wiggle.clone()), ("IHF", wiggle)]);
        let config = RotationConfig {
            universe: vec!["IHI".to_string(), "IHF".to_string()],
            ..plain_config()
        };
        let weights = build_monthly_rotation_weights(&prices, &config).unwrap();
        let last = weights.row(weights.n_rows() - 1);
        assert_eq!(last[0], 0.0);
        assert!(last[1] > 0.0);
    }

    #[test]
    fn test_rotation_trend_filter_forces_cash() {
        let dates = business_days(
            Date::from_ymd_opt(2020, 1, 1).unwrap(),
            Date::from_ymd_opt(2020, 6, 30).unwrap(),
        );
        let n = dates.len();
        let prices = panel(
            dates,
            vec![
                ("XBI", linspace(100.0, 140.0, n)),
                ("XLV", linspace(100.0, 90.0, n)),
            ],
        );
        let config = RotationConfig {
            use_trend_filter: true,
            trend_lookback_months: 1,
            ..plain_config()
        };
        let weights = build_monthly_rotation_weights(&prices, &config).unwrap();
        assert!(weights.values().iter().all(|&w| w == 0.0));

        let open = build_monthly_rotation_weights(&prices, &plain_config()).unwrap();
        assert!(open.row(open.n_rows() - 1)[0] > 0.0);
    }

    #[test]
    fn test_rotation_ts_gate() {
        let dates = business_days(
            Date::from_ymd_opt(2020, 1, 1).unwrap(),
            Date::from_ymd_opt(2020, 6, 30).unwrap(),
        );
        let n = dates.len();
        let crash_end = dates.iter().filter(|d| d.month() <= 4).count();
        // IHI slumps through April then rebounds hard; XBI grinds higher.
        let mut rebound = linspace(100.0, 60.0, crash_end);
        rebound.extend(linspace(61.0, 75.0, n - crash_end));
        let prices = panel(
            dates,
            vec![("IHI", rebound), ("XBI", linspace(100.0, 110.0, n))],
        );

        let ungated = RotationConfig {
            universe: vec!["IHI".to_string(), "XBI".to_string()],
            ..plain_config()
        };
        let weights = build_monthly_rotation_weights(&prices, &ungated).unwrap();
        let last = weights.row(weights.n_rows() - 1);
        assert!(last[0] > 0.0);
        assert_eq!(last[1], 0.0);

        let gated = RotationConfig {
            use_ts_mom_gating: true,
            ts_lookback_months: 3,
            ..ungated
        };
        let weights = build_monthly_rotation_weights(&prices, &gated).unwrap();
        let last = weights.row(weights.n_rows() - 1);
        assert_eq!(last[0], 0.0);
        assert!(last[1] > 0.0);
    }

    #[test]
    fn test_rotation_missing_universe_is_flat() {
        let dates = business_days(
            Date::from_ymd_opt(2020, 1, 1).unwrap(),
            Date::from_ymd_opt(2020, 3, 31).unwrap(),
        );
        let n = dates.len();
        let prices = panel(dates, vec![("SPY", linspace(100.0, 120.0, n))]);
        let weights = build_monthly_rotation_weights(&prices, &plain_config()).unwrap();
        prices.ensure_aligned(&weights).unwrap();
        assert!(weights.values().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_rotation_builder_name() {
        assert_eq!(RotationSignal::default().name(), "rotation");
    }
}
