//! Long/short spread between an aggressive and a defensive healthcare leg.
//!
//! The spread is long the aggressive leg (biotech by default) and short the
//! defensive leg (pharma) in risk-on months. What happens in risk-off months,
//! and how the legs are sized, is chosen with [`SpreadMode`].

use std::fmt;
use std::str::FromStr;

use caduceus_portfolio::{MonthlySchedule, VolEstimator, inverse_vol_weights};
use caduceus_traits::{
    CaduceusError, Date, PricePanel, Result, Ticker, TimeSeries, WeightSchedule,
    ensure_positive,
};
use ndarray::{Array1, array};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::regime::Regime;

/// The two tickers of the spread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadLegs {
    /// Leg held long in risk-on months (default: XBI)
    pub aggressive: Ticker,

    /// Leg held short in risk-on months (default: XPH)
    pub defensive: Ticker,
}

impl Default for SpreadLegs {
    fn default() -> Self {
        Self {
            aggressive: "XBI".to_string(),
            defensive: "XPH".to_string(),
        }
    }
}

impl SpreadLegs {
    /// Create a leg pair.
    #[must_use]
    pub fn new(aggressive: impl Into<Ticker>, defensive: impl Into<Ticker>) -> Self {
        Self {
            aggressive: aggressive.into(),
            defensive: defensive.into(),
        }
    }

    /// Both tickers, aggressive first.
    #[must_use]
    pub fn tickers(&self) -> [Ticker; 2] {
        [self.aggressive.clone(), self.defensive.clone()]
    }

    /// Checks the legs are distinct and both priced in `prices`.
    ///
    /// # Errors
    ///
    /// [`CaduceusError::InvalidParameter`] for identical legs,
    /// [`CaduceusError::MissingColumn`] for an unpriced leg.
    pub fn validate(&self, prices: &PricePanel) -> Result<()> {
        if self.aggressive == self.defensive {
            return Err(CaduceusError::InvalidParameter(format!(
                "spread legs must differ, both are '{}'",
                self.aggressive
            )));
        }
        for leg in [&self.aggressive, &self.defensive] {
            if !prices.has_column(leg) {
                return Err(CaduceusError::MissingColumn(format!(
                    "spread leg '{leg}' not in price panel"
                )));
            }
        }
        Ok(())
    }
}

/// Position taken in risk-off months by the simple spread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskOffMode {
    /// Both legs at zero.
    #[default]
    Flat,
    /// Long the defensive leg only.
    #[serde(alias = "long_pharma")]
    LongDefensive,
    /// Short aggressive, long defensive.
    Reverse,
}

impl RiskOffMode {
    /// (aggressive, defensive) weights for a risk-off month.
    #[must_use]
    pub const fn weights(self) -> (f64, f64) {
        match self {
            Self::Flat => (0.0, 0.0),
            Self::LongDefensive => (0.0, 1.0),
            Self::Reverse => (-1.0, 1.0),
        }
    }
}

impl FromStr for RiskOffMode {
    type Err = CaduceusError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "flat" => Ok(Self::Flat),
            "long_defensive" | "long_pharma" => Ok(Self::LongDefensive),
            "reverse" => Ok(Self::Reverse),
            other => Err(CaduceusError::UnknownMode(format!(
                "risk-off mode '{other}' (expected flat, long_defensive or reverse)"
            ))),
        }
    }
}

impl fmt::Display for RiskOffMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Flat => "flat",
            Self::LongDefensive => "long_defensive",
            Self::Reverse => "reverse",
        };
        f.write_str(s)
    }
}

/// Parameters of the risk-balanced spread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskBalancedConfig {
    /// Gross exposure of the two legs combined (default: 1.0)
    pub target_gross_exposure: f64,

    /// Spread momentum must exceed this to trade (default: 0.0)
    pub spread_mom_threshold: f64,

    /// Months over which spread momentum is measured (default: 6)
    pub spread_mom_lookback_months: usize,

    /// Trading days in the leg volatility window (default: 60)
    pub vol_lookback_days: usize,

    /// Finite returns needed before a leg volatility is reported (default: 1)
    pub vol_min_periods: usize,
}

impl Default for RiskBalancedConfig {
    fn default() -> Self {
        Self {
            target_gross_exposure: 1.0,
            spread_mom_threshold: 0.0,
            spread_mom_lookback_months: 6,
            vol_lookback_days: 60,
            vol_min_periods: 1,
        }
    }
}

/// Sizing mode of the spread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum SpreadMode {
    /// +1/-1 in risk-on months, `risk_off` otherwise.
    Simple {
        /// Risk-off behaviour
        risk_off: RiskOffMode,
    },
    /// Inverse-vol legs gated on regime and spread momentum.
    RiskBalanced(RiskBalancedConfig),
}

impl Default for SpreadMode {
    fn default() -> Self {
        Self::Simple {
            risk_off: RiskOffMode::Flat,
        }
    }
}

impl FromStr for SpreadMode {
    type Err = CaduceusError;

    /// Parses `simple` / `risk_balanced` with default parameters.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "simple" => Ok(Self::default()),
            "risk_balanced" => Ok(Self::RiskBalanced(RiskBalancedConfig::default())),
            other => Err(CaduceusError::UnknownMode(format!(
                "spread mode '{other}' (expected simple or risk_balanced)"
            ))),
        }
    }
}

/// Signed weights of the two legs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LegWeights {
    /// Aggressive leg weight
    pub aggressive: f64,
    /// Defensive leg weight
    pub defensive: f64,
}

impl LegWeights {
    /// Both legs at zero.
    pub const FLAT: Self = Self {
        aggressive: 0.0,
        defensive: 0.0,
    };

    fn to_array(self) -> Array1<f64> {
        array![self.aggressive, self.defensive]
    }
}

/// Month-end momentum of the spread: change in `ln(P_aggressive / P_defensive)`
/// over `lookback_months`.
///
/// # Errors
///
/// Fails on a zero lookback or a missing leg.
pub fn compute_spread_momentum(
    prices: &PricePanel,
    legs: &SpreadLegs,
    lookback_months: usize,
) -> Result<TimeSeries> {
    ensure_positive("spread_mom_lookback_months", lookback_months)?;
    let monthly = prices.select(&legs.tickers())?.resample_month_end_last();
    let log_spread: Vec<f64> = (0..monthly.n_rows())
        .map(|i| (monthly.value(i, 0) / monthly.value(i, 1)).ln())
        .collect();
    let log_spread = TimeSeries::new(monthly.index().to_vec(), log_spread)?;
    Ok(log_spread.diff(lookback_months))
}

/// Inverse-vol leg sizes scaled to `target_gross_exposure`, long aggressive
/// and short defensive. Flat if either volatility is missing or non-positive.
#[must_use]
pub fn compute_risk_balanced_ls_weights(
    aggressive_vol: f64,
    defensive_vol: f64,
    target_gross_exposure: f64,
) -> LegWeights {
    let usable = |v: f64| v.is_finite() && v > 0.0;
    if !usable(aggressive_vol) || !usable(defensive_vol) {
        return LegWeights::FLAT;
    }
    inverse_vol_weights(&array![aggressive_vol, defensive_vol]).map_or(LegWeights::FLAT, |w| {
        LegWeights {
            aggressive: w[0] * target_gross_exposure,
            defensive: -w[1] * target_gross_exposure,
        }
    })
}

/// Regime-driven long/short spread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpreadSignal {
    /// The two legs
    pub legs: SpreadLegs,

    /// Sizing mode
    pub mode: SpreadMode,
}

impl SpreadSignal {
    /// Create a spread signal.
    #[must_use]
    pub const fn new(legs: SpreadLegs, mode: SpreadMode) -> Self {
        Self { legs, mode }
    }

    /// Month-end leg weights, one row per rebalance month.
    ///
    /// # Errors
    ///
    /// Fails on invalid legs or mode parameters.
    pub fn monthly_weights(
        &self,
        prices: &PricePanel,
        regimes: &TimeSeries<Regime>,
    ) -> Result<MonthlySchedule> {
        self.legs.validate(prices)?;
        let mut schedule = MonthlySchedule::new(self.legs.tickers().to_vec());
        match self.mode {
            SpreadMode::Simple { risk_off } => {
                for (date, regime) in regimes.iter() {
                    let (aggr, def) = if regime.is_risk_on() {
                        (1.0, -1.0)
                    } else {
                        risk_off.weights()
                    };
                    schedule.push(date, array![aggr, def])?;
                }
            }
            SpreadMode::RiskBalanced(config) => {
                self.fill_risk_balanced(prices, regimes, &config, &mut schedule)?;
            }
        }
        Ok(schedule)
    }

    fn fill_risk_balanced(
        &self,
        prices: &PricePanel,
        regimes: &TimeSeries<Regime>,
        config: &RiskBalancedConfig,
        schedule: &mut MonthlySchedule,
    ) -> Result<()> {
        if config.target_gross_exposure.is_nan() || config.target_gross_exposure < 0.0 {
            return Err(CaduceusError::InvalidParameter(format!(
                "target_gross_exposure must be non-negative, got {}",
                config.target_gross_exposure
            )));
        }
        let spread_mom =
            compute_spread_momentum(prices, &self.legs, config.spread_mom_lookback_months)?;
        let leg_prices = prices.select(&self.legs.tickers())?;
        let vols = VolEstimator::new(config.vol_lookback_days, config.vol_min_periods)?
            .estimate(&leg_prices.simple_returns())?;

        let rebalance_dates: Vec<Date> = spread_mom
            .index()
            .iter()
            .copied()
            .filter(|&d| regimes.get(d).is_some())
            .collect();

        for date in rebalance_dates {
            let risk_on = regimes.get(date).is_some_and(|r| r.is_risk_on());
            let momentum = spread_mom.get(date).copied().unwrap_or(f64::NAN);
            let gate_open = risk_on && momentum > config.spread_mom_threshold;
            let weights = if gate_open {
                vols.asof_position(date).map_or(LegWeights::FLAT, |row| {
                    compute_risk_balanced_ls_weights(
                        vols.value(row, 0),
                        vols.value(row, 1),
                        config.target_gross_exposure,
                    )
                })
            } else {
                LegWeights::FLAT
            };
            if gate_open && weights == LegWeights::FLAT {
                debug!(%date, "leg volatility unavailable, spread flat");
            }
            schedule.push(date, weights.to_array())?;
        }
        Ok(())
    }

    /// Daily weights over the full price universe.
    ///
    /// Monthly leg weights are held until the next rebalance; tickers other
    /// than the two legs carry zero weight.
    ///
    /// # Errors
    ///
    /// Fails on invalid legs or mode parameters.
    pub fn build_weights(
        &self,
        prices: &PricePanel,
        regimes: &TimeSeries<Regime>,
    ) -> Result<WeightSchedule> {
        self.monthly_weights(prices, regimes)?.into_daily(prices)
    }
}

/// Daily spread weights for `prices` given monthly regime labels.
///
/// # Errors
///
/// Fails on invalid legs or mode parameters.
pub fn build_monthly_ls_weights(
    regimes: &TimeSeries<Regime>,
    prices: &PricePanel,
    legs: &SpreadLegs,
    mode: SpreadMode,
) -> Result<WeightSchedule> {
    SpreadSignal::new(legs.clone(), mode).build_weights(prices, regimes)
}
