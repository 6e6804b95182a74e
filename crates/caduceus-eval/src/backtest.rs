//! Daily backtest engine.
//!
//! Converts a target weight schedule and a price panel into realized,
//! cost-adjusted daily returns. Weights decided at the close of day `t` earn
//! the return from `t` to `t + 1`, so the engine never looks ahead.

use caduceus_traits::stats::TRADING_DAYS_PER_YEAR;
use caduceus_traits::{CaduceusError, PricePanel, Result, TimeSeries, WeightSchedule};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::metrics::PerformanceSummary;

/// Backtesting configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Transaction cost charged on one-way turnover (basis points)
    pub transaction_cost_bps: f64,
    /// Annual borrow fee charged on short exposure
    pub borrow_cost_annual: f64,
    /// Annual rate credited on uninvested capital
    pub cash_rate_annual: f64,
}

impl BacktestConfig {
    /// Zero borrow and cash rates with the given transaction cost.
    #[must_use]
    pub const fn with_transaction_cost(transaction_cost_bps: f64) -> Self {
        Self {
            transaction_cost_bps,
            borrow_cost_annual: 0.0,
            cash_rate_annual: 0.0,
        }
    }

    /// Checks that every cost parameter is a finite non-negative number.
    ///
    /// # Errors
    ///
    /// Returns [`CaduceusError::InvalidParameter`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("transaction_cost_bps", self.transaction_cost_bps),
            ("borrow_cost_annual", self.borrow_cost_annual),
            ("cash_rate_annual", self.cash_rate_annual),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CaduceusError::InvalidParameter(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Backtesting results.
///
/// Every series shares the price panel's date index. `daily_returns` is NaN
/// free and starts at exactly 0.0; `equity_curve` starts at exactly 1.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    daily_returns: TimeSeries,
    gross_returns: TimeSeries,
    costs: TimeSeries,
    equity_curve: TimeSeries,
    weights: WeightSchedule,
    turnover: TimeSeries,
    meta: BacktestConfig,
}

impl BacktestResult {
    /// Net daily returns after all costs.
    #[must_use]
    pub const fn daily_returns(&self) -> &TimeSeries {
        &self.daily_returns
    }

    /// Daily returns before costs.
    #[must_use]
    pub const fn gross_returns(&self) -> &TimeSeries {
        &self.gross_returns
    }

    /// Per-day trading and borrow costs net of the cash credit, so that
    /// `daily_returns = gross_returns - costs` from day two on.
    #[must_use]
    pub const fn costs(&self) -> &TimeSeries {
        &self.costs
    }

    /// Compounded wealth starting at 1.0.
    #[must_use]
    pub const fn equity_curve(&self) -> &TimeSeries {
        &self.equity_curve
    }

    /// The lagged weights that earned each day's return.
    #[must_use]
    pub const fn weights(&self) -> &WeightSchedule {
        &self.weights
    }

    /// One-way turnover of the target weights per day.
    #[must_use]
    pub const fn turnover(&self) -> &TimeSeries {
        &self.turnover
    }

    /// Cost parameters the result was produced with.
    #[must_use]
    pub const fn meta(&self) -> &BacktestConfig {
        &self.meta
    }

    /// Final equity minus one.
    #[must_use]
    pub fn total_return(&self) -> f64 {
        self.equity_curve.values().last().map_or(f64::NAN, |e| e - 1.0)
    }

    /// Headline performance statistics of the net returns.
    #[must_use]
    pub fn summary(&self) -> PerformanceSummary {
        PerformanceSummary::from_returns(self.daily_returns.values(), 0.0)
    }
}

/// Backtesting engine.
#[derive(Debug, Default)]
pub struct Backtest {
    /// Configuration
    config: BacktestConfig,
}

impl Backtest {
    /// Create a new backtest with configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Cost parameters
    ///
    /// # Example
    ///
    /// ```rust
    /// use caduceus_eval::{Backtest, BacktestConfig};
    ///
    /// let backtest = Backtest::new(BacktestConfig::with_transaction_cost(10.0));
    /// assert_eq!(backtest.config().transaction_cost_bps, 10.0);
    /// ```
    #[must_use]
    pub const fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run the backtest.
    ///
    /// # Arguments
    ///
    /// * `prices` - Daily adjusted closes
    /// * `weights` - Target weights, same index and columns as `prices`
    ///
    /// # Errors
    ///
    /// Returns [`CaduceusError::Alignment`] if the panels differ in dates or
    /// columns (including column order), or
    /// [`CaduceusError::InvalidParameter`] for a negative cost.
    pub fn run(&self, prices: &PricePanel, weights: &WeightSchedule) -> Result<BacktestResult> {
        prices.ensure_aligned(weights)?;
        self.config.validate()?;
        info!(
            transaction_cost_bps = self.config.transaction_cost_bps,
            borrow_cost_annual = self.config.borrow_cost_annual,
            cash_rate_annual = self.config.cash_rate_annual,
            days = prices.n_rows(),
            "running backtest"
        );

        let targets = weights.fill_nan(0.0);
        let asset_returns = prices.simple_returns();
        let lagged = targets.shift(1).fill_nan(0.0);

        let tc_rate = self.config.transaction_cost_bps / 10_000.0;
        let borrow_daily = self.config.borrow_cost_annual / TRADING_DAYS_PER_YEAR;
        let cash_daily = self.config.cash_rate_annual / TRADING_DAYS_PER_YEAR;

        let n = prices.n_rows();
        let mut net = Vec::with_capacity(n);
        let mut gross = Vec::with_capacity(n);
        let mut costs = Vec::with_capacity(n);
        let mut turnover = Vec::with_capacity(n);
        let mut equity = Vec::with_capacity(n);

        for t in 0..n {
            let held = lagged.row(t);
            let port_ret = Self::calculate_portfolio_return(held, asset_returns.row(t));
            let day_turnover = if t == 0 {
                0.0
            } else {
                Self::calculate_turnover(targets.row(t - 1), targets.row(t))
            };

            let short_exposure: f64 = held.iter().filter(|w| **w < 0.0).map(|w| w.abs()).sum();
            let net_exposure: f64 = held.sum();
            let day_cost = tc_rate * day_turnover + borrow_daily * short_exposure
                - cash_daily * (1.0 - net_exposure).max(0.0);

            let (day_net, day_cost) = if t == 0 {
                (0.0, 0.0)
            } else {
                (port_ret - day_cost, day_cost)
            };
            let wealth = equity.last().map_or(1.0, |prev: &f64| prev * (1.0 + day_net));

            gross.push(port_ret);
            costs.push(day_cost);
            net.push(day_net);
            turnover.push(day_turnover);
            equity.push(wealth);
        }

        let index = prices.index().to_vec();
        Ok(BacktestResult {
            daily_returns: TimeSeries::new(index.clone(), net)?,
            gross_returns: TimeSeries::new(index.clone(), gross)?,
            costs: TimeSeries::new(index.clone(), costs)?,
            equity_curve: TimeSeries::new(index.clone(), equity)?,
            weights: lagged,
            turnover: TimeSeries::new(index, turnover)?,
            meta: self.config,
        })
    }

    /// Calculate portfolio return given positions and asset returns.
    fn calculate_portfolio_return(
        positions: ArrayView1<'_, f64>,
        returns: ArrayView1<'_, f64>,
    ) -> f64 {
        positions
            .iter()
            .zip(returns.iter())
            .map(|(&pos, &ret)| {
                if pos.is_finite() && ret.is_finite() {
                    pos * ret
                } else {
                    0.0
                }
            })
            .sum()
    }

    /// Calculate turnover between old and new positions.
    fn calculate_turnover(
        old_positions: ArrayView1<'_, f64>,
        new_positions: ArrayView1<'_, f64>,
    ) -> f64 {
        old_positions
            .iter()
            .zip(new_positions.iter())
            .map(|(&old, &new)| (new - old).abs())
            .sum::<f64>()
            / 2.0
    }
}

/// Runs a backtest of `weights` against `prices` with `config`.
///
/// # Errors
///
/// See [`Backtest::run`].
pub fn run_backtest(
    prices: &PricePanel,
    weights: &WeightSchedule,
    config: &BacktestConfig,
) -> Result<BacktestResult> {
    Backtest::new(*config).run(prices, weights)
}
