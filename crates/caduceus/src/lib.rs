#![doc(issue_tracker_base_url = "https://github.com/factordynamics/caduceus/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # caduceus
//!
//! Backtests for two healthcare sector ETF strategies.
//!
//! caduceus is an umbrella crate that re-exports the caduceus sub-crates and
//! adds the end-to-end runners that tie them together.
//!
//! ## Quick Start
//!
//! ```ignore
//! use caduceus::{MacroInputs, RunConfig, run_all};
//!
//! # fn main() -> caduceus::Result<()> {
//! let config = RunConfig::from_json_str(r#"{ "backtest": { "transaction_cost_bps": 10.0 } }"#)?;
//! let macro_inputs = MacroInputs { rate: treasury_yield, vol_index: vix };
//! for report in run_all(&prices, Some(&macro_inputs), &config)? {
//!     println!("{:<20} sharpe {:.2}", report.name, report.summary.sharpe);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Organization
//!
//! - [`traits`] - Panels, time series, errors and the [`WeightBuilder`] trait
//! - [`portfolio`] - Volatility estimation and weight shaping
//! - [`signals`] - Regime, spread, rotation and benchmark weight builders
//! - [`eval`] - Backtest engine, metrics and parameter sweeps
//!
//! ## Strategies
//!
//! 1. **Regime long/short**: month-end macro features label each month
//!    risk-on or risk-off; risk-on months hold biotech long against pharma
//!    short.
//! 2. **Rotation**: month-end momentum ranks the healthcare ETFs, the top
//!    names are held inverse-volatility weighted and scaled to a volatility
//!    target.
//!
//! Weights decided at a close earn the next day's return, net of turnover
//! costs, borrow fees and the cash credit.

/// Version information for the caduceus crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod config;
mod pipeline;

// ============================================================================
// Sub-crates
// ============================================================================

/// Core data model and trait definitions.
pub mod traits {
    pub use caduceus_traits::*;
}

/// Volatility estimation and weight-shaping utilities.
pub mod portfolio {
    pub use caduceus_portfolio::*;
}

/// Signal-to-weights builders.
///
/// ## Available Builders
///
/// - **RegimeModel** + **SpreadSignal**: macro regime long/short spread
/// - **RotationSignal**: momentum rotation with volatility targeting
/// - **BuyAndHold**, **EqualWeight**: benchmarks
pub mod signals {
    pub use caduceus_signals::*;
}

/// Backtesting and evaluation.
///
/// ## Cost Model
///
/// ```text
/// turnover_t = sum_i |w_t,i - w_t-1,i| / 2
/// cost_t     = turnover_t * bps / 1e4
///            + borrow / 252 * sum_i max(-w_t-1,i, 0)
///            - cash / 252 * max(1 - sum_i w_t-1,i, 0)
/// ```
pub mod eval {
    pub use caduceus_eval::*;
}

// Re-export main types
pub use caduceus_eval::{
    Backtest, BacktestConfig, BacktestResult, PerformanceSummary, to_monthly_returns,
};
pub use caduceus_traits::{CaduceusError, Date, Panel, Result, Ticker, TimeSeries, WeightBuilder};
pub use config::{RegimeStrategyConfig, RunConfig, StrategySelection};
pub use pipeline::{
    BenchmarkRun, MacroInputs, RegimeRun, StrategyReport, run_all, run_benchmarks,
    run_regime_strategy, run_rotation_strategy,
};
