//! Signal-to-weights builders for the caduceus healthcare ETF strategies.
//!
//! This crate turns prices and macro series into target weight schedules:
//!
//! - [`regime`]: month-end macro features and the risk-on / risk-off label
//! - [`spread`]: the regime-driven long/short spread between two legs
//! - [`rotation`]: momentum rotation with volatility targeting
//! - [`momentum`]: month-end momentum primitives shared by the above
//! - [`benchmark`]: buy-and-hold and equal-weight reference portfolios
//!
//! Every schedule comes back aligned with the input price panel, ready for
//! the backtest engine.
//!
//! # Examples
//!
//! ```rust,no_run
//! use caduceus_signals::{RegimeModel, SpreadSignal};
//! # fn inputs() -> (caduceus_traits::PricePanel, caduceus_traits::TimeSeries,
//! #     caduceus_traits::TimeSeries, caduceus_traits::TimeSeries) { unimplemented!() }
//!
//! let (prices, rate, spy, vix) = inputs();
//! let regimes = RegimeModel::default().classify(&rate, &spy, &vix)?;
//! let weights = SpreadSignal::default().build_weights(&prices, &regimes)?;
//! # Ok::<(), caduceus_traits::CaduceusError>(())
//! ```

pub mod benchmark;
pub mod momentum;
pub mod regime;
pub mod rotation;
pub mod spread;

// Re-export main types
pub use benchmark::{BuyAndHold, EqualWeight};
pub use momentum::MomentumScore;
pub use regime::{
    FeatureColumns, Regime, RegimeFeatureConfig, RegimeModel, RegimeThresholds, classify_regime,
    compute_monthly_features, risk_on_fraction,
};
pub use rotation::{RotationConfig, RotationSignal, build_monthly_rotation_weights};
pub use spread::{
    LegWeights, RiskBalancedConfig, RiskOffMode, SpreadLegs, SpreadMode, SpreadSignal,
    build_monthly_ls_weights, compute_risk_balanced_ls_weights, compute_spread_momentum,
};
