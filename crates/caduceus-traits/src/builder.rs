//! Weight builder trait for turning prices into a daily weight schedule.
//!
//! Every strategy and benchmark in the workspace is a `WeightBuilder`. The
//! backtest engine only ever sees the schedule a builder produces, which keeps
//! signal construction and P&L evaluation independent of each other.

use crate::{PricePanel, Result, WeightSchedule};

/// Produces a daily weight schedule aligned with a price panel.
///
/// Implementations must be pure: the same prices always yield the same
/// schedule, and the prices are only read. The returned schedule must have
/// exactly the index and columns of `prices` so it can go straight into the
/// backtest engine.
///
/// # Example
///
/// ```no_run
/// use caduceus_traits::{Panel, PricePanel, Result, WeightBuilder, WeightSchedule};
///
/// struct AllCash;
///
/// impl WeightBuilder for AllCash {
///     fn name(&self) -> &str {
///         "all_cash"
///     }
///
///     fn build(&self, prices: &PricePanel) -> Result<WeightSchedule> {
///         Panel::filled(prices.index().to_vec(), prices.columns().to_vec(), 0.0)
///     }
/// }
/// ```
pub trait WeightBuilder: Send + Sync {
    /// A short identifier used in logs and reports.
    fn name(&self) -> &str;

    /// Builds the daily weight schedule for `prices`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the builder's parameters are invalid
    /// or the prices lack a column the builder requires. Data degeneracies
    /// (missing volatility, no positive momentum) are never errors; they
    /// produce flat weights.
    fn build(&self, prices: &PricePanel) -> Result<WeightSchedule>;
}
