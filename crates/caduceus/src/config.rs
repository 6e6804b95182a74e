//! Immutable run configuration.
//!
//! A [`RunConfig`] is built once (usually from JSON) and passed by reference
//! to every runner. Missing JSON fields take their documented defaults.

use std::fmt;
use std::str::FromStr;

use caduceus_eval::BacktestConfig;
use caduceus_signals::{RegimeModel, RotationConfig, SpreadLegs, SpreadMode};
use caduceus_traits::{CaduceusError, Date, Result, Ticker};
use serde::{Deserialize, Serialize};

/// Which strategies a run executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategySelection {
    /// Regime long/short only
    Regime,
    /// Momentum rotation only
    Rotation,
    /// Both strategies
    #[default]
    Both,
}

impl StrategySelection {
    /// Whether the regime strategy runs.
    #[must_use]
    pub const fn includes_regime(self) -> bool {
        matches!(self, Self::Regime | Self::Both)
    }

    /// Whether the rotation strategy runs.
    #[must_use]
    pub const fn includes_rotation(self) -> bool {
        matches!(self, Self::Rotation | Self::Both)
    }
}

impl FromStr for StrategySelection {
    type Err = CaduceusError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "regime" => Ok(Self::Regime),
            "rotation" => Ok(Self::Rotation),
            "both" => Ok(Self::Both),
            other => Err(CaduceusError::UnknownMode(format!(
                "strategy '{other}' (expected regime, rotation or both)"
            ))),
        }
    }
}

impl fmt::Display for StrategySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regime => write!(f, "regime"),
            Self::Rotation => write!(f, "rotation"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// Settings of the regime long/short strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeStrategyConfig {
    /// Feature lookbacks, thresholds and column mapping
    pub model: RegimeModel,

    /// Spread legs (default: XBI / XPH)
    pub legs: SpreadLegs,

    /// Spread sizing (default: simple, flat when risk-off)
    pub mode: SpreadMode,

    /// Equity index whose closes feed the index-return feature (default: SPY)
    pub index_ticker: Ticker,
}

impl Default for RegimeStrategyConfig {
    fn default() -> Self {
        Self {
            model: RegimeModel::default(),
            legs: SpreadLegs::default(),
            mode: SpreadMode::default(),
            index_ticker: "SPY".to_string(),
        }
    }
}

/// Everything one end-to-end run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Cost model applied to both strategies and the equal-weight benchmark
    pub backtest: BacktestConfig,

    /// Strategies to run (default: both)
    pub strategy: StrategySelection,

    /// Regime long/short settings
    pub regime: RegimeStrategyConfig,

    /// Rotation settings
    pub rotation: RotationConfig,

    /// Buy-and-hold benchmarks, run at zero cost (default: XLV, SPY)
    pub benchmark_tickers: Vec<Ticker>,

    /// First price date used (default: all history)
    pub start: Option<Date>,

    /// Last price date used (default: all history)
    pub end: Option<Date>,

    /// In/out-of-sample boundary for reports (default: none)
    pub split_date: Option<Date>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            backtest: BacktestConfig::default(),
            strategy: StrategySelection::default(),
            regime: RegimeStrategyConfig::default(),
            rotation: RotationConfig::default(),
            benchmark_tickers: vec!["XLV".to_string(), "SPY".to_string()],
            start: None,
            end: None,
            split_date: None,
        }
    }
}

impl RunConfig {
    /// Parses a configuration from JSON, then validates it.
    ///
    /// # Errors
    ///
    /// Returns [`CaduceusError::Config`] for malformed JSON and the
    /// validation error otherwise.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CaduceusError::Config`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks cost, rotation and date-range parameters.
    ///
    /// # Errors
    ///
    /// Returns [`CaduceusError::InvalidParameter`] for the first bad value.
    pub fn validate(&self) -> Result<()> {
        self.backtest.validate()?;
        self.rotation.validate()?;
        if self.regime.legs.aggressive == self.regime.legs.defensive {
            return Err(CaduceusError::InvalidParameter(format!(
                "spread legs must differ, both are '{}'",
                self.regime.legs.aggressive
            )));
        }
        if let (Some(start), Some(end)) = (self.start, self.end)
            && start > end
        {
            return Err(CaduceusError::InvalidParameter(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(())
    }

    /// Whether `date` falls inside the configured start/end range.
    #[must_use]
    pub fn in_range(&self, date: Date) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}
