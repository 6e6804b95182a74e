#![doc(issue_tracker_base_url = "https://github.com/factordynamics/caduceus/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core data model and trait definitions for the Caduceus backtesting workspace.
//!
//! This crate provides the containers every other crate passes around
//! ([`Panel`], [`TimeSeries`]), the shared error type, month-end calendar
//! helpers, small statistics helpers, and the [`WeightBuilder`] trait that
//! strategies and benchmarks implement.

/// The version of the caduceus-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod builder;
pub mod calendar;
pub mod error;
pub mod stats;
pub mod types;

// Re-exports
pub use builder::WeightBuilder;
pub use calendar::{CE_TO_UNIX_EPOCH_DAYS, month_end, month_ends_between};
pub use error::{CaduceusError, Result, ensure_positive};
pub use stats::TRADING_DAYS_PER_YEAR;
pub use types::{Date, Panel, PricePanel, Ticker, TimeSeries, WeightSchedule};
