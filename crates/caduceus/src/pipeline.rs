//! End-to-end strategy runners.
//!
//! Each runner slices the price panel to the tickers it trades, builds daily
//! weights, backtests them and hands back the full [`BacktestResult`].

use caduceus_eval::{BacktestConfig, BacktestResult, PerformanceSummary, PeriodSummary};
use caduceus_eval::{run_backtest, summarize_over_periods};
use caduceus_signals::{
    BuyAndHold, EqualWeight, Regime, RotationSignal, SpreadSignal, risk_on_fraction,
};
use caduceus_traits::{Date, PricePanel, Result, TimeSeries, WeightBuilder};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::RunConfig;

/// Macro series consumed by the regime classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroInputs {
    /// Treasury yield (or any rate level), daily
    pub rate: TimeSeries,
    /// Implied-volatility index level, daily
    pub vol_index: TimeSeries,
}

/// Output of the regime long/short strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegimeRun {
    /// Backtest of the two spread legs
    pub result: BacktestResult,
    /// Monthly labels the spread followed
    pub regimes: TimeSeries<Regime>,
    /// Share of labelled months that were risk-on
    pub risk_on_fraction: f64,
}

/// A named benchmark backtest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkRun {
    /// Builder name, e.g. `buy_and_hold_xlv`
    pub name: String,
    /// Benchmark backtest
    pub result: BacktestResult,
}

/// Headline statistics of one strategy or benchmark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyReport {
    /// Display name
    pub name: String,
    /// Full-sample statistics
    pub summary: PerformanceSummary,
    /// Statistics either side of the split date, when one is configured
    pub periods: Option<PeriodSummary>,
}

impl StrategyReport {
    /// Summarizes `result` under `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, result: &BacktestResult, split_date: Option<Date>) -> Self {
        Self {
            name: name.into(),
            summary: result.summary(),
            periods: split_date.map(|split| summarize_over_periods(result.daily_returns(), split)),
        }
    }
}

/// Rows of `prices` inside the configured date range.
fn date_slice(prices: &PricePanel, config: &RunConfig) -> PricePanel {
    prices.filter_rows(|d| config.in_range(d))
}

/// Runs the regime long/short spread.
///
/// Prices are restricted to the two legs and the index ticker and trimmed to
/// dates where all three are priced; the index closes feed the classifier and
/// only the legs are traded.
///
/// # Errors
///
/// Fails on a missing leg or index ticker, invalid lookbacks or costs, or
/// unresolvable feature columns.
pub fn run_regime_strategy(
    prices: &PricePanel,
    macro_inputs: &MacroInputs,
    config: &RunConfig,
) -> Result<RegimeRun> {
    let regime = &config.regime;
    regime.legs.validate(prices)?;
    let [aggressive, defensive] = regime.legs.tickers();
    let slice = date_slice(prices, config)
        .select(&[aggressive.as_str(), defensive.as_str(), regime.index_ticker.as_str()])?
        .drop_incomplete_rows();
    let index_price = slice.column_series(&regime.index_ticker)?;
    let pair = slice.select(&[aggressive, defensive])?;

    let regimes = regime
        .model
        .classify(&macro_inputs.rate, &index_price, &macro_inputs.vol_index)?;
    let fraction = risk_on_fraction(&regimes);
    info!(
        months = regimes.len(),
        risk_on_fraction = fraction,
        mode = ?regime.mode,
        "running regime strategy"
    );

    let signal = SpreadSignal::new(regime.legs.clone(), regime.mode);
    let weights = signal.build_weights(&pair, &regimes)?;
    let result = run_backtest(&pair, &weights, &config.backtest)?;
    Ok(RegimeRun {
        result,
        regimes,
        risk_on_fraction: fraction,
    })
}

/// Runs the momentum rotation over the configured universe.
///
/// Universe members missing from `prices` are skipped; the remaining columns
/// are trimmed to dates where every one of them is priced.
///
/// # Errors
///
/// Fails on an invalid rotation or cost configuration.
pub fn run_rotation_strategy(prices: &PricePanel, config: &RunConfig) -> Result<BacktestResult> {
    let rotation = &config.rotation;
    let present: Vec<&str> = rotation
        .universe
        .iter()
        .filter(|t| prices.has_column(t))
        .map(String::as_str)
        .collect();
    let slice = date_slice(prices, config)
        .select(&present)?
        .drop_incomplete_rows();
    info!(
        universe = present.len(),
        days = slice.n_rows(),
        "running rotation strategy"
    );

    let weights = RotationSignal::new(rotation.clone()).build(&slice)?;
    run_backtest(&slice, &weights, &config.backtest)
}

/// Runs the buy-and-hold and equal-weight benchmarks.
///
/// Buy-and-hold benchmarks trade the whole panel at zero cost; tickers that are
/// not priced are skipped. The equal-weight basket holds the priced rotation
/// universe, rebalanced monthly at the configured cost.
///
/// # Errors
///
/// Fails on an invalid cost configuration.
pub fn run_benchmarks(prices: &PricePanel, config: &RunConfig) -> Result<Vec<BenchmarkRun>> {
    let prices = date_slice(prices, config);
    let mut runs = Vec::new();

    for ticker in &config.benchmark_tickers {
        if !prices.has_column(ticker) {
            warn!(ticker = %ticker, "benchmark ticker not priced, skipping");
            continue;
        }
        let builder = BuyAndHold::new(ticker.clone());
        let weights = builder.build(&prices)?;
        let result = run_backtest(&prices, &weights, &BacktestConfig::default())?;
        runs.push(BenchmarkRun {
            name: builder.name().to_string(),
            result,
        });
    }

    let basket: Vec<&str> = config
        .rotation
        .universe
        .iter()
        .filter(|t| prices.has_column(t))
        .map(String::as_str)
        .collect();
    if !basket.is_empty() {
        let basket_prices = prices.select(&basket)?;
        let builder = EqualWeight::new(basket.iter().map(|t| (*t).to_string()).collect());
        let weights = builder.build(&basket_prices)?;
        let result = run_backtest(&basket_prices, &weights, &config.backtest)?;
        runs.push(BenchmarkRun {
            name: builder.name().to_string(),
            result,
        });
    }
    Ok(runs)
}

/// Runs the selected strategies and every benchmark, returning one report each.
///
/// The regime strategy needs `macro_inputs`; without them it is skipped with a
/// warning.
///
/// # Errors
///
/// Propagates the first runner error.
pub fn run_all(
    prices: &PricePanel,
    macro_inputs: Option<&MacroInputs>,
    config: &RunConfig,
) -> Result<Vec<StrategyReport>> {
    config.validate()?;
    let mut reports = Vec::new();

    if config.strategy.includes_regime() {
        match macro_inputs {
            Some(inputs) => {
                let run = run_regime_strategy(prices, inputs, config)?;
                reports.push(StrategyReport::new("regime_ls", &run.result, config.split_date));
            }
            None => warn!("no macro inputs supplied, skipping regime strategy"),
        }
    }
    if config.strategy.includes_rotation() {
        let result = run_rotation_strategy(prices, config)?;
        reports.push(StrategyReport::new("rotation", &result, config.split_date));
    }
    for run in run_benchmarks(prices, config)? {
        reports.push(StrategyReport::new(run.name, &run.result, config.split_date));
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use caduceus_traits::Panel;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    fn days(start: Date, n: usize) -> Vec<Date> {
        (0..n as u64).map(|i| start + chrono::Days::new(i)).collect()
    }

    fn prices() -> Panel {
        let index = days(d(2019, 1, 1), 900);
        let n = index.len();
        let series = |base: f64, drift: f64| -> Vec<f64> {
            (0..n).map(|i| base * (1.0 + drift * i as f64)).collect()
        };
        Panel::from_columns(
            index,
            vec![
                ("XBI".into(), series(100.0, 0.001)),
                ("XPH".into(), series(50.0, 0.0002)),
                ("SPY".into(), series(300.0, 0.0005)),
                ("XLV".into(), series(90.0, 0.0004)),
            ],
        )
        .unwrap()
    }

    fn macro_inputs() -> MacroInputs {
        let index = days(d(2019, 1, 1), 900);
        let n = index.len();
        MacroInputs {
            rate: TimeSeries::new(index.clone(), (0..n).map(|i| 2.0 - 0.001 * i as f64).collect())
                .unwrap(),
            vol_index: TimeSeries::new(index, vec![15.0; n]).unwrap(),
        }
    }

    #[test]
    fn test_regime_strategy_trades_only_legs() {
        let run = run_regime_strategy(&prices(), &macro_inputs(), &RunConfig::default()).unwrap();
        assert_eq!(run.result.weights().columns(), &["XBI".to_string(), "XPH".to_string()]);
        // Falling rates, rising index and calm vol: risk-on once the lookbacks fill.
        assert!(run.risk_on_fraction > 0.5 && run.risk_on_fraction < 1.0);
        assert_eq!(run.regimes.values().last(), Some(&Regime::RiskOn));
        let w = run.result.weights();
        let last = w.n_rows() - 1;
        assert_relative_eq!(w.value(last, 0), 1.0);
        assert_relative_eq!(w.value(last, 1), -1.0);
    }

    #[test]
    fn test_regime_strategy_missing_index() {
        let prices = prices().select(&["XBI", "XPH"]).unwrap();
        assert!(run_regime_strategy(&prices, &macro_inputs(), &RunConfig::default()).is_err());
    }

    #[test]
    fn test_rotation_skips_missing_universe() {
        let result = run_rotation_strategy(&prices(), &RunConfig::default()).unwrap();
        assert_eq!(
            result.weights().columns(),
            &["XBI".to_string(), "XPH".to_string(), "XLV".to_string()]
        );
        assert!(result.daily_returns().values().iter().all(|r| r.is_finite()));
    }

    #[test]
    fn test_benchmarks() {
        let runs = run_benchmarks(&prices(), &RunConfig::default()).unwrap();
        let names: Vec<&str> = runs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["buy_and_hold_xlv", "buy_and_hold_spy", "equal_weight"]);
        let xlv = &runs[0].result;
        let expected = 90.0 * (1.0 + 0.0004 * 899.0) / 90.0 - 1.0;
        assert_relative_eq!(xlv.total_return(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_date_range_applies() {
        let config = RunConfig {
            start: Some(d(2020, 1, 1)),
            end: Some(d(2020, 12, 31)),
            ..RunConfig::default()
        };
        let result = run_rotation_strategy(&prices(), &config).unwrap();
        assert_eq!(result.daily_returns().index().first(), Some(&d(2020, 1, 1)));
        assert_eq!(result.daily_returns().index().last(), Some(&d(2020, 12, 31)));
    }

    #[test]
    fn test_run_all() {
        let config = RunConfig {
            split_date: Some(d(2020, 1, 1)),
            ..RunConfig::default()
        };
        let reports = run_all(&prices(), Some(&macro_inputs()), &config).unwrap();
        let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["regime_ls", "rotation", "buy_and_hold_xlv", "buy_and_hold_spy", "equal_weight"]
        );
        assert!(reports.iter().all(|r| r.periods.is_some()));

        let without_macro = run_all(&prices(), None, &RunConfig::default()).unwrap();
        assert_eq!(without_macro[0].name, "rotation");
    }
}
