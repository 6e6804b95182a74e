//! Passive benchmark portfolios.

use caduceus_portfolio::MonthlySchedule;
use caduceus_traits::{
    CaduceusError, Panel, PricePanel, Result, Ticker, WeightBuilder, WeightSchedule,
    month_ends_between,
};
use ndarray::Array1;
use tracing::warn;

/// Fully invested in one ticker every day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyAndHold {
    ticker: Ticker,
    name: String,
}

impl BuyAndHold {
    /// Buy-and-hold of `ticker`.
    #[must_use]
    pub fn new(ticker: impl Into<Ticker>) -> Self {
        let ticker = ticker.into();
        let name = format!("buy_and_hold_{}", ticker.to_lowercase());
        Self { ticker, name }
    }

    /// The held ticker.
    #[must_use]
    pub fn ticker(&self) -> &str {
        &self.ticker
    }
}

impl WeightBuilder for BuyAndHold {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(&self, prices: &PricePanel) -> Result<WeightSchedule> {
        let col = prices.column_position(&self.ticker).ok_or_else(|| {
            CaduceusError::MissingColumn(format!("benchmark ticker '{}' not priced", self.ticker))
        })?;
        let weights = Panel::filled(prices.index().to_vec(), prices.columns().to_vec(), 0.0)?;
        Ok(weights.map_cells(|_, j, _| if j == col { 1.0 } else { 0.0 }))
    }
}

/// Equal weights across a basket, reset at every calendar month-end.
///
/// Tickers missing from the price panel are left out of the basket. Days
/// before the first month-end hold cash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualWeight {
    tickers: Vec<Ticker>,
}

impl EqualWeight {
    /// Equal-weight basket of `tickers`.
    #[must_use]
    pub const fn new(tickers: Vec<Ticker>) -> Self {
        Self { tickers }
    }

    /// The configured basket.
    #[must_use]
    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }
}

impl WeightBuilder for EqualWeight {
    fn name(&self) -> &str {
        "equal_weight"
    }

    fn build(&self, prices: &PricePanel) -> Result<WeightSchedule> {
        let members: Vec<usize> = self
            .tickers
            .iter()
            .filter_map(|t| {
                let pos = prices.column_position(t);
                if pos.is_none() {
                    warn!(ticker = %t, "basket member not priced, skipping");
                }
                pos
            })
            .collect();

        let mut schedule = MonthlySchedule::new(prices.columns().to_vec());
        if let (Some(&first), Some(&last), false) =
            (prices.index().first(), prices.index().last(), members.is_empty())
        {
            let mut row = Array1::zeros(prices.n_cols());
            let share = 1.0 / members.len() as f64;
            for &j in &members {
                row[j] = share;
            }
            for date in month_ends_between(first, last) {
                schedule.push(date, row.clone())?;
            }
        }
        schedule.into_daily(prices)
    }
}
