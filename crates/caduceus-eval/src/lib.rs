//! Backtesting and performance evaluation for caduceus.
//!
//! This crate provides:
//! - A daily backtest engine with turnover, borrow and cash-rate accounting
//! - Performance metrics (CAGR, Sharpe, Sortino, drawdowns, capture ratios)
//! - In-sample / out-of-sample splits and parameter sweeps
//!
//! # Example
//!
//! ```rust,ignore
//! use caduceus_eval::{Backtest, BacktestConfig};
//!
//! let result = Backtest::new(BacktestConfig::with_transaction_cost(10.0)).run(&prices, &weights)?;
//! let summary = result.summary();
//! println!("sharpe {:.2}, max drawdown {:.1}%", summary.sharpe, summary.max_drawdown * 100.0);
//! ```

pub mod backtest;
pub mod metrics;
pub mod robustness;

// Re-export main types
pub use backtest::{Backtest, BacktestConfig, BacktestResult, run_backtest};
pub use metrics::{PerformanceSummary, to_monthly_returns};
pub use robustness::{
    PeriodSummary, RankKey, RegimeGrid, RegimeLsGrid, RotationGrid, SweepOptions, SweepParams,
    SweepRecord, rank_records, split_periods, summarize_over_periods, sweep_regime_ls_parameters,
    sweep_regime_parameters, sweep_rotation_parameters,
};
