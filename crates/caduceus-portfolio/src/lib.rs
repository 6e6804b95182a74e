//! Volatility estimation and weight shaping for caduceus strategies.
//!
//! The signal crates decide *what* to hold; this crate decides *how much*:
//! rolling volatility, inverse-volatility risk weights, volatility targeting
//! with a gross-leverage cap, and the plumbing that turns month-end targets
//! into a daily schedule over the full price universe.
//!
//! # Examples
//!
//! ```rust
//! use caduceus_portfolio::{inverse_vol_weights, scale_weights_to_target_vol};
//! use ndarray::array;
//!
//! let vols = array![0.20, 0.40];
//! let risk = inverse_vol_weights(&vols).unwrap();
//! let sized = scale_weights_to_target_vol(&risk, &vols, 0.10, 1.5).unwrap();
//! assert!(sized.iter().map(|w| w.abs()).sum::<f64>() <= 1.5);
//! ```

mod vol;
mod weights;

pub use vol::{
    VolEstimator, estimate_rolling_vol, inverse_vol_weights, scale_weights_to_target_vol,
};
pub use weights::{MonthlySchedule, cap_gross_leverage, extend_to_universe, forward_fill_to_index};
