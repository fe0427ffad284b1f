//! Strategy selection — a serde-tagged config turned into a runtime trait object.

use serde::{Deserialize, Serialize};

use super::{
    BuyAndHold, MaCross, MaCrossParams, ObvTrend, ObvTrendParams, Rsi, RsiParams, Strategy,
    StrategyError,
};

/// Which bundled strategy to run, with its parameters.
///
/// In TOML: `[strategy]` with `type = "ma_cross"` and the parameter keys
/// alongside. Omitted parameters take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategySpec {
    MaCross(MaCrossParams),
    Rsi(RsiParams),
    ObvTrend(ObvTrendParams),
    BuyAndHold,
}

impl Default for StrategySpec {
    fn default() -> Self {
        StrategySpec::MaCross(MaCrossParams::default())
    }
}

impl StrategySpec {
    pub fn name(&self) -> &'static str {
        match self {
            StrategySpec::MaCross(_) => "ma_cross",
            StrategySpec::Rsi(_) => "rsi",
            StrategySpec::ObvTrend(_) => "obv_trend",
            StrategySpec::BuyAndHold => "buy_and_hold",
        }
    }

    pub fn validate(&self) -> Result<(), StrategyError> {
        match self {
            StrategySpec::MaCross(p) => p.validate(),
            StrategySpec::Rsi(p) => p.validate(),
            StrategySpec::ObvTrend(p) => p.validate(),
            StrategySpec::BuyAndHold => Ok(()),
        }
    }

    /// True if the strategy emits ADJUST target weights rather than LONG/EXIT.
    pub fn emits_target_weights(&self) -> bool {
        matches!(self, StrategySpec::ObvTrend(_))
    }

    /// Build a fresh strategy instance for one run.
    pub fn build(&self) -> Result<Box<dyn Strategy>, StrategyError> {
        Ok(match self {
            StrategySpec::MaCross(p) => Box::new(MaCross::new(p.clone())?),
            StrategySpec::Rsi(p) => Box::new(Rsi::new(p.clone())?),
            StrategySpec::ObvTrend(p) => Box::new(ObvTrend::new(p.clone())?),
            StrategySpec::BuyAndHold => Box::new(BuyAndHold::new()),
        })
    }
}
