//! In-sample / out-of-sample splits and parameter sweeps.
//!
//! A sweep expands a grid into its cartesian product, backtests every point
//! against the same read-only inputs and returns one [`SweepRecord`] per point
//! in grid order (first grid dimension varies slowest). With
//! [`SweepOptions::parallel`] the points run on the rayon pool; the output is
//! identical either way.

use std::cmp::Ordering;

use caduceus_signals::{
    FeatureColumns, Regime, RegimeThresholds, RiskBalancedConfig, RiskOffMode, RotationConfig,
    SpreadLegs, SpreadMode, build_monthly_ls_weights, build_monthly_rotation_weights,
    classify_regime,
};
use caduceus_traits::{Date, Panel, PricePanel, Result, TimeSeries};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backtest::{BacktestConfig, BacktestResult, run_backtest};
use crate::metrics::{
    PerformanceSummary, compute_annual_vol, compute_cagr, compute_max_drawdown, compute_sharpe,
};

/// Splits returns into dates strictly before `split_date` and the rest.
#[must_use]
pub fn split_periods(returns: &TimeSeries, split_date: Date) -> (TimeSeries, TimeSeries) {
    (
        returns.filter_dates(|d| d < split_date),
        returns.filter_dates(|d| d >= split_date),
    )
}

/// Performance over the full sample and either side of a split date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodSummary {
    /// Whole sample
    pub full: PerformanceSummary,
    /// Dates before the split
    pub in_sample: PerformanceSummary,
    /// Dates on or after the split
    pub out_of_sample: PerformanceSummary,
}

/// Summarizes `returns` over the full, in-sample and out-of-sample periods.
///
/// Each sub-period's drawdown is measured on its own compounded curve.
#[must_use]
pub fn summarize_over_periods(returns: &TimeSeries, split_date: Date) -> PeriodSummary {
    let (in_sample, out_of_sample) = split_periods(returns, split_date);
    PeriodSummary {
        full: PerformanceSummary::from_returns(returns.values(), 0.0),
        in_sample: PerformanceSummary::from_returns(in_sample.values(), 0.0),
        out_of_sample: PerformanceSummary::from_returns(out_of_sample.values(), 0.0),
    }
}

/// Settings shared by every sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepOptions {
    /// Transaction cost per grid point backtest (default: 10 bps)
    pub transaction_cost_bps: f64,
    /// In/out-of-sample boundary (default: 2015-01-01)
    pub split_date: Date,
    /// Evaluate grid points on the rayon pool (default: false)
    pub parallel: bool,
}

const DEFAULT_SPLIT_DATE: Date = match Date::from_ymd_opt(2015, 1, 1) {
    Some(date) => date,
    None => panic!("invalid default split date"),
};

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            transaction_cost_bps: 10.0,
            split_date: DEFAULT_SPLIT_DATE,
            parallel: false,
        }
    }
}

impl SweepOptions {
    fn backtest_config(&self) -> BacktestConfig {
        BacktestConfig::with_transaction_cost(self.transaction_cost_bps)
    }
}

/// The parameters behind one sweep record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "sweep")]
pub enum SweepParams {
    /// Macro thresholds of the simple spread.
    Regime {
        /// Thresholds used to label months
        thresholds: RegimeThresholds,
    },
    /// Rotation settings that vary across the grid.
    Rotation {
        /// Momentum lookback in months
        lookback_months: usize,
        /// Number of assets held
        top_k: usize,
        /// Time-series momentum gate
        use_ts_mom_gating: bool,
        /// 12-minus-1 scoring
        use_12m1m: bool,
        /// Trend filter
        use_trend_filter: bool,
        /// Gate lookback in months
        ts_lookback_months: usize,
        /// Annual volatility target
        target_vol_annual: f64,
        /// Gross leverage cap
        max_gross_leverage: f64,
    },
    /// Risk-balanced spread settings, with optional macro threshold overrides.
    RegimeLs {
        /// Minimum spread momentum to open the spread
        spread_mom_threshold: f64,
        /// Gross exposure of the open spread
        target_gross_exposure: f64,
        /// Rate threshold override
        rate_threshold: Option<f64>,
        /// Vol-index threshold override
        vix_threshold: Option<f64>,
        /// Index return threshold override
        spy_ret_threshold: Option<f64>,
    },
}

impl SweepParams {
    fn from_rotation(config: &RotationConfig) -> Self {
        Self::Rotation {
            lookback_months: config.lookback_months,
            top_k: config.top_k,
            use_ts_mom_gating: config.use_ts_mom_gating,
            use_12m1m: config.use_12m1m,
            use_trend_filter: config.use_trend_filter,
            ts_lookback_months: config.ts_lookback_months,
            target_vol_annual: config.target_vol_annual,
            max_gross_leverage: config.max_gross_leverage,
        }
    }
}

/// Outcome of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRecord {
    /// Parameters of the point
    pub params: SweepParams,
    /// Sharpe over the whole sample
    pub sharpe_full: f64,
    /// Sharpe before the split date
    pub sharpe_in: f64,
    /// Sharpe on or after the split date
    pub sharpe_out: f64,
    /// Full-sample CAGR
    pub cagr: f64,
    /// Full-sample annual volatility
    pub vol: f64,
    /// Full-sample maximum drawdown
    pub max_drawdown: f64,
}

impl SweepRecord {
    fn from_result(params: SweepParams, result: &BacktestResult, split_date: Date) -> Self {
        let returns = result.daily_returns();
        let (in_sample, out_of_sample) = split_periods(returns, split_date);
        Self {
            params,
            sharpe_full: compute_sharpe(returns.values(), 0.0),
            sharpe_in: compute_sharpe(in_sample.values(), 0.0),
            sharpe_out: compute_sharpe(out_of_sample.values(), 0.0),
            cagr: compute_cagr(returns.values()),
            vol: compute_annual_vol(returns.values()),
            max_drawdown: compute_max_drawdown(result.equity_curve().values()),
        }
    }
}

/// Crosses every item with every value, the existing items varying slowest.
fn expand<T: Clone, V>(items: Vec<T>, values: &[V], set: impl Fn(&mut T, &V)) -> Vec<T> {
    let set = &set;
    items
        .into_iter()
        .flat_map(|item| {
            values.iter().map(move |v| {
                let mut next = item.clone();
                set(&mut next, v);
                next
            })
        })
        .collect()
}

fn run_grid<P, F>(
    name: &str,
    points: &[P],
    options: &SweepOptions,
    evaluate: F,
) -> Result<Vec<SweepRecord>>
where
    P: Sync,
    F: Fn(&P) -> Result<SweepRecord> + Sync,
{
    info!(
        sweep = name,
        points = points.len(),
        parallel = options.parallel,
        "running parameter sweep"
    );
    if options.parallel {
        points.par_iter().map(&evaluate).collect()
    } else {
        points.iter().map(&evaluate).collect()
    }
}

/// Macro-threshold grid for the simple spread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeGrid {
    /// Rate-change thresholds (default: [-0.25, 0.0, 0.25])
    pub rate_thresholds: Vec<f64>,
    /// Vol-index thresholds (default: [20, 25, 30])
    pub vix_thresholds: Vec<f64>,
    /// Index return thresholds (default: [0.0])
    pub spy_ret_thresholds: Vec<f64>,
    /// Feature columns to classify on
    pub columns: FeatureColumns,
    /// Risk-off behaviour of the spread (default: flat)
    pub risk_off: RiskOffMode,
}

impl Default for RegimeGrid {
    fn default() -> Self {
        Self {
            rate_thresholds: vec![-0.25, 0.0, 0.25],
            vix_thresholds: vec![20.0, 25.0, 30.0],
            spy_ret_thresholds: vec![0.0],
            columns: FeatureColumns::default(),
            risk_off: RiskOffMode::Flat,
        }
    }
}

impl RegimeGrid {
    fn points(&self) -> Vec<RegimeThresholds> {
        let points = vec![RegimeThresholds::default()];
        let points = expand(points, &self.rate_thresholds, |t, &v| t.rate_threshold = v);
        let points = expand(points, &self.vix_thresholds, |t, &v| t.vix_threshold = v);
        expand(points, &self.spy_ret_thresholds, |t, &v| t.spy_ret_threshold = v)
    }
}

/// Backtests the simple spread at every macro-threshold combination.
///
/// Only the two spread legs of `prices` are traded.
///
/// # Errors
///
/// Fails on missing legs or unresolvable feature columns.
pub fn sweep_regime_parameters(
    prices: &PricePanel,
    features: &Panel,
    grid: &RegimeGrid,
    legs: &SpreadLegs,
    options: &SweepOptions,
) -> Result<Vec<SweepRecord>> {
    legs.validate(prices)?;
    let pair = prices.select(&legs.tickers())?;
    let mode = SpreadMode::Simple { risk_off: grid.risk_off };
    let config = options.backtest_config();
    run_grid("regime", &grid.points(), options, |thresholds| {
        let regimes = classify_regime(features, thresholds, &grid.columns)?;
        let weights = build_monthly_ls_weights(&regimes, &pair, legs, mode)?;
        let result = run_backtest(&pair, &weights, &config)?;
        Ok(SweepRecord::from_result(
            SweepParams::Regime { thresholds: *thresholds },
            &result,
            options.split_date,
        ))
    })
}

/// Rotation grid; every other setting comes from the base configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationGrid {
    /// Momentum lookbacks in months (default: [6, 12])
    pub lookbacks: Vec<usize>,
    /// Holdings counts (default: [1, 2])
    pub top_ks: Vec<usize>,
    /// Gate on/off (default: [true])
    pub use_ts_flags: Vec<bool>,
    /// 12-minus-1 on/off (default: [true])
    pub use_12m1m_flags: Vec<bool>,
    /// Trend filter on/off (default: [true])
    pub use_trend_filters: Vec<bool>,
    /// Gate lookbacks in months (default: [6, 12])
    pub ts_lookbacks: Vec<usize>,
    /// Annual volatility targets (default: [0.10])
    pub target_vols: Vec<f64>,
    /// Gross leverage caps (default: [1.5])
    pub max_gross: Vec<f64>,
}

impl Default for RotationGrid {
    fn default() -> Self {
        Self {
            lookbacks: vec![6, 12],
            top_ks: vec![1, 2],
            use_ts_flags: vec![true],
            use_12m1m_flags: vec![true],
            use_trend_filters: vec![true],
            ts_lookbacks: vec![6, 12],
            target_vols: vec![0.10],
            max_gross: vec![1.5],
        }
    }
}

impl RotationGrid {
    /// Every configuration of the grid applied on top of `base`, in grid order.
    #[must_use]
    pub fn configs(&self, base: &RotationConfig) -> Vec<RotationConfig> {
        let c = vec![base.clone()];
        let c = expand(c, &self.lookbacks, |c, &v| c.lookback_months = v);
        let c = expand(c, &self.top_ks, |c, &v| c.top_k = v);
        let c = expand(c, &self.use_ts_flags, |c, &v| c.use_ts_mom_gating = v);
        let c = expand(c, &self.use_12m1m_flags, |c, &v| c.use_12m1m = v);
        let c = expand(c, &self.use_trend_filters, |c, &v| c.use_trend_filter = v);
        let c = expand(c, &self.ts_lookbacks, |c, &v| c.ts_lookback_months = v);
        let c = expand(c, &self.target_vols, |c, &v| c.target_vol_annual = v);
        expand(c, &self.max_gross, |c, &v| c.max_gross_leverage = v)
    }
}

/// Backtests the rotation strategy at every grid point.
///
/// # Errors
///
/// Fails on the first invalid configuration in the grid.
pub fn sweep_rotation_parameters(
    prices: &PricePanel,
    grid: &RotationGrid,
    base: &RotationConfig,
    options: &SweepOptions,
) -> Result<Vec<SweepRecord>> {
    let config = options.backtest_config();
    run_grid("rotation", &grid.configs(base), options, |rotation| {
        let weights = build_monthly_rotation_weights(prices, rotation)?;
        let result = run_backtest(prices, &weights, &config)?;
        Ok(SweepRecord::from_result(
            SweepParams::from_rotation(rotation),
            &result,
            options.split_date,
        ))
    })
}

/// Risk-balanced spread grid.
///
/// The threshold lists are optional; when any is set (and monthly features are
/// supplied to the sweep) each point relabels the months, taking unset
/// thresholds from `fallback_thresholds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeLsGrid {
    /// Spread momentum thresholds (default: [0.0])
    pub spread_mom_thresholds: Vec<f64>,
    /// Gross exposures (default: [1.0])
    pub target_gross: Vec<f64>,
    /// Rate threshold overrides
    pub rate_thresholds: Option<Vec<f64>>,
    /// Vol-index threshold overrides
    pub vix_thresholds: Option<Vec<f64>>,
    /// Index return threshold overrides
    pub spy_ret_thresholds: Option<Vec<f64>>,
    /// Thresholds for overrides left unset (default: rate -0.5, vix 25, index 0)
    pub fallback_thresholds: RegimeThresholds,
    /// Feature columns to classify on
    pub columns: FeatureColumns,
}

impl Default for RegimeLsGrid {
    fn default() -> Self {
        Self {
            spread_mom_thresholds: vec![0.0],
            target_gross: vec![1.0],
            rate_thresholds: None,
            vix_thresholds: None,
            spy_ret_thresholds: None,
            fallback_thresholds: RegimeThresholds::new(-0.5, 25.0, 0.0),
            columns: FeatureColumns::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct LsPoint {
    spread_mom_threshold: f64,
    target_gross_exposure: f64,
    rate: Option<f64>,
    vix: Option<f64>,
    spy: Option<f64>,
}

impl LsPoint {
    const fn has_override(&self) -> bool {
        self.rate.is_some() || self.vix.is_some() || self.spy.is_some()
    }

    fn thresholds(&self, fallback: &RegimeThresholds) -> RegimeThresholds {
        RegimeThresholds::new(
            self.rate.unwrap_or(fallback.rate_threshold),
            self.vix.unwrap_or(fallback.vix_threshold),
            self.spy.unwrap_or(fallback.spy_ret_threshold),
        )
    }

    const fn params(&self) -> SweepParams {
        SweepParams::RegimeLs {
            spread_mom_threshold: self.spread_mom_threshold,
            target_gross_exposure: self.target_gross_exposure,
            rate_threshold: self.rate,
            vix_threshold: self.vix,
            spy_ret_threshold: self.spy,
        }
    }
}

fn optional_axis(values: Option<&Vec<f64>>) -> Vec<Option<f64>> {
    values.map_or_else(|| vec![None], |v| v.iter().copied().map(Some).collect())
}

impl RegimeLsGrid {
    fn points(&self) -> Vec<LsPoint> {
        let p = vec![LsPoint::default()];
        let p = expand(p, &self.spread_mom_thresholds, |p, &v| p.spread_mom_threshold = v);
        let p = expand(p, &self.target_gross, |p, &v| p.target_gross_exposure = v);
        let p = expand(p, &optional_axis(self.rate_thresholds.as_ref()), |p, &v| p.rate = v);
        let p = expand(p, &optional_axis(self.vix_thresholds.as_ref()), |p, &v| p.vix = v);
        expand(p, &optional_axis(self.spy_ret_thresholds.as_ref()), |p, &v| p.spy = v)
    }
}

/// Backtests the risk-balanced spread at every grid point.
///
/// `regimes` are used as-is unless the point carries threshold overrides and
/// `features` is supplied. `base` provides the spread momentum and vol
/// lookbacks.
///
/// # Errors
///
/// Fails on missing legs, a negative gross exposure or unresolvable feature
/// columns.
pub fn sweep_regime_ls_parameters(
    prices: &PricePanel,
    regimes: &TimeSeries<Regime>,
    features: Option<&Panel>,
    legs: &SpreadLegs,
    grid: &RegimeLsGrid,
    base: &RiskBalancedConfig,
    options: &SweepOptions,
) -> Result<Vec<SweepRecord>> {
    legs.validate(prices)?;
    let pair = prices.select(&legs.tickers())?;
    let config = options.backtest_config();
    run_grid("regime_ls", &grid.points(), options, |point| {
        let relabelled = match features {
            Some(features) if point.has_override() => Some(classify_regime(
                features,
                &point.thresholds(&grid.fallback_thresholds),
                &grid.columns,
            )?),
            _ => None,
        };
        let mode = SpreadMode::RiskBalanced(RiskBalancedConfig {
            target_gross_exposure: point.target_gross_exposure,
            spread_mom_threshold: point.spread_mom_threshold,
            ..*base
        });
        let labels = relabelled.as_ref().unwrap_or(regimes);
        let weights = build_monthly_ls_weights(labels, &pair, legs, mode)?;
        let result = run_backtest(&pair, &weights, &config)?;
        Ok(SweepRecord::from_result(point.params(), &result, options.split_date))
    })
}

/// Metric to rank sweep records by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankKey {
    /// Full-sample Sharpe
    #[default]
    SharpeFull,
    /// In-sample Sharpe
    SharpeIn,
    /// Out-of-sample Sharpe
    SharpeOut,
    /// Full-sample CAGR
    Cagr,
}

impl RankKey {
    const fn value(self, record: &SweepRecord) -> f64 {
        match self {
            Self::SharpeFull => record.sharpe_full,
            Self::SharpeIn => record.sharpe_in,
            Self::SharpeOut => record.sharpe_out,
            Self::Cagr => record.cagr,
        }
    }
}

/// Sorts records best first by `key`. NaN sorts last; ties keep grid order.
#[must_use]
pub fn rank_records(mut records: Vec<SweepRecord>, key: RankKey) -> Vec<SweepRecord> {
    records.sort_by(|a, b| {
        let (x, y) = (key.value(a), key.value(b));
        match (x.is_nan(), y.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => y.total_cmp(&x),
        }
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use caduceus_traits::month_ends_between;
    use chrono::{Datelike, Weekday};

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    fn business_days(start: Date, end: Date) -> Vec<Date> {
        start
            .iter_days()
            .take_while(|x| *x <= end)
            .filter(|x| !matches!(x.weekday(), Weekday::Sat | Weekday::Sun))
            .collect()
    }

    fn record(sharpe_full: f64, cagr: f64) -> SweepRecord {
        SweepRecord {
            params: SweepParams::Regime {
                thresholds: RegimeThresholds::default(),
            },
            sharpe_full,
            sharpe_in: f64::NAN,
            sharpe_out: f64::NAN,
            cagr,
            vol: 0.1,
            max_drawdown: 0.1,
        }
    }

    /// Two years of daily prices: XBI trends up with a wobble, XPH drifts, IHI falls.
    fn prices() -> PricePanel {
        let index = business_days(d(2013, 1, 1), d(2016, 12, 31));
        let n = index.len();
        let xbi: Vec<f64> = (0..n).map(|i| 100.0 * (1.0 + 0.0008 * i as f64 + 0.01 * (i as f64 * 0.3).sin())).collect();
        let xph: Vec<f64> = (0..n).map(|i| 50.0 * (1.0 + 0.0002 * i as f64 + 0.005 * (i as f64 * 0.7).cos())).collect();
        let ihi: Vec<f64> = (0..n).map(|i| 80.0 * (1.0 - 0.0001 * i as f64 + 0.004 * (i as f64 * 0.5).sin())).collect();
        Panel::from_columns(
            index,
            vec![("XBI".into(), xbi), ("XPH".into(), xph), ("IHI".into(), ihi)],
        )
        .unwrap()
    }

    fn features() -> Panel {
        let months = month_ends_between(d(2013, 1, 1), d(2016, 12, 31));
        let n = months.len();
        Panel::from_columns(
            months,
            vec![
                ("delta_rate_6m".into(), (0..n).map(|i| if i % 3 == 0 { 0.3 } else { -0.1 }).collect()),
                ("spy_return_6m".into(), vec![0.05; n]),
                ("vix_mean_1m".into(), (0..n).map(|i| 15.0 + (i % 5) as f64 * 3.0).collect()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_split_periods() {
        let dates = vec![d(2014, 12, 31), d(2015, 1, 1), d(2015, 1, 2)];
        let returns = TimeSeries::new(dates, vec![0.1, 0.2, 0.3]).unwrap();
        let (before, after) = split_periods(&returns, d(2015, 1, 1));
        assert_eq!(before.values(), &[0.1]);
        assert_eq!(after.values(), &[0.2, 0.3]);
    }

    #[test]
    fn test_summarize_over_periods() {
        let returns = TimeSeries::new(
            vec![d(2014, 12, 30), d(2014, 12, 31), d(2015, 1, 2), d(2015, 1, 5)],
            vec![0.1, -0.2, 0.05, -0.5],
        )
        .unwrap();
        let summary = summarize_over_periods(&returns, d(2015, 1, 1));
        assert_relative_eq!(summary.in_sample.max_drawdown, 0.2, epsilon = 1e-12);
        assert_relative_eq!(summary.out_of_sample.max_drawdown, 0.5, epsilon = 1e-12);
        assert_relative_eq!(summary.full.cagr, compute_cagr(returns.values()));
    }

    #[test]
    fn test_default_options() {
        let options = SweepOptions::default();
        assert_eq!(options.transaction_cost_bps, 10.0);
        assert_eq!(options.split_date, d(2015, 1, 1));
        assert!(!options.parallel);
    }

    #[test]
    fn test_expand_order() {
        let grid = RotationGrid {
            lookbacks: vec![3, 6],
            top_ks: vec![1, 2],
            ts_lookbacks: vec![12],
            ..RotationGrid::default()
        };
        let configs = grid.configs(&RotationConfig::default());
        let pairs: Vec<(usize, usize)> = configs.iter().map(|c| (c.lookback_months, c.top_k)).collect();
        assert_eq!(pairs, vec![(3, 1), (3, 2), (6, 1), (6, 2)]);
        assert_eq!(RotationGrid::default().configs(&RotationConfig::default()).len(), 8);
    }

    #[test]
    fn test_regime_sweep() {
        let grid = RegimeGrid {
            rate_thresholds: vec![0.0, 0.5],
            vix_thresholds: vec![25.0],
            ..RegimeGrid::default()
        };
        let records = sweep_regime_parameters(
            &prices(),
            &features(),
            &grid,
            &SpreadLegs::default(),
            &SweepOptions::default(),
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert!(matches!(
            records[1].params,
            SweepParams::Regime { thresholds } if thresholds.rate_threshold == 0.5
        ));
        assert!(records.iter().all(|r| r.sharpe_full.is_finite()));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let grid = RotationGrid {
            lookbacks: vec![3, 6],
            top_ks: vec![1, 2],
            use_trend_filters: vec![false],
            ts_lookbacks: vec![3],
            ..RotationGrid::default()
        };
        let base = RotationConfig {
            universe: vec!["XBI".into(), "XPH".into(), "IHI".into()],
            ..RotationConfig::default()
        };
        let sequential = sweep_rotation_parameters(&prices(), &grid, &base, &SweepOptions::default()).unwrap();
        let parallel = sweep_rotation_parameters(
            &prices(),
            &grid,
            &base,
            &SweepOptions {
                parallel: true,
                ..SweepOptions::default()
            },
        )
        .unwrap();
        assert_eq!(sequential.len(), 4);
        for (a, b) in sequential.iter().zip(parallel.iter()) {
            assert_eq!(a.params, b.params);
            assert_eq!(a.sharpe_full.to_bits(), b.sharpe_full.to_bits());
        }
    }

    #[test]
    fn test_rotation_sweep_invalid_config_aborts() {
        let grid = RotationGrid {
            top_ks: vec![0],
            ..RotationGrid::default()
        };
        assert!(sweep_rotation_parameters(&prices(), &grid, &RotationConfig::default(), &SweepOptions::default())
            .is_err());
    }

    #[test]
    fn test_regime_ls_sweep_overrides() {
        let labels = TimeSeries::new(
            features().index().to_vec(),
            vec![Regime::RiskOn; features().n_rows()],
        )
        .unwrap();
        let grid = RegimeLsGrid {
            target_gross: vec![0.5, 1.0],
            vix_thresholds: Some(vec![10.0]),
            ..RegimeLsGrid::default()
        };
        let base = RiskBalancedConfig::default();
        let with_features = sweep_regime_ls_parameters(
            &prices(),
            &labels,
            Some(&features()),
            &SpreadLegs::default(),
            &grid,
            &base,
            &SweepOptions::default(),
        )
        .unwrap();
        assert_eq!(with_features.len(), 2);
        // A vix threshold below every reading labels every month risk-off, so the spread never opens.
        assert!(with_features.iter().all(|r| r.sharpe_full.is_nan()));
        assert!(matches!(
            with_features[0].params,
            SweepParams::RegimeLs { target_gross_exposure, vix_threshold: Some(v), rate_threshold: None, .. }
                if target_gross_exposure == 0.5 && v == 10.0
        ));
    }

    #[test]
    fn test_rank_records() {
        let records = vec![record(0.5, 0.1), record(f64::NAN, 0.3), record(1.2, 0.05), record(0.5, 0.2)];
        let ranked = rank_records(records, RankKey::SharpeFull);
        let sharpes: Vec<f64> = ranked.iter().map(|r| r.sharpe_full).collect();
        assert_eq!(&sharpes[..3], &[1.2, 0.5, 0.5]);
        assert!(sharpes[3].is_nan());
        // Stable: the two 0.5 records keep their order.
        assert_eq!(ranked[1].cagr, 0.1);
        assert_eq!(ranked[2].cagr, 0.2);

        let by_cagr = rank_records(ranked, RankKey::Cagr);
        assert_eq!(by_cagr[0].cagr, 0.3);
    }
}
