//! On-balance-volume trend follower with tiered target weights.
//!
//! OBV above its own SMA means money is flowing in. With the close also
//! above its `price_window` SMA the target is `strong_weight`, with OBV
//! alone it is `weak_weight`, otherwise 0. An ADJUST carrying the target
//! weight is emitted only when the tier moves by more than 0.01, so the
//! portfolio must run weight-rebalance sizing to interpret it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Strategy, StrategyError};
use crate::data::BarFeed;
use crate::domain::{Field, MarketEvent, SignalEvent, SignalType};
use crate::queue::EventQueue;

/// Extra bars fetched beyond `obv_window` for trend context.
const CONTEXT_BARS: usize = 100;
const TIER_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObvTrendParams {
    pub obv_window: usize,
    pub price_window: usize,
    pub strong_weight: f64,
    pub weak_weight: f64,
}

impl Default for ObvTrendParams {
    fn default() -> Self {
        Self {
            obv_window: 20,
            price_window: 60,
            strong_weight: 0.20,
            weak_weight: 0.10,
        }
    }
}

impl ObvTrendParams {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.obv_window < 2 {
            return Err(StrategyError::InvalidParams(
                "obv_trend: obv_window must be >= 2".into(),
            ));
        }
        if self.price_window == 0 {
            return Err(StrategyError::InvalidParams(
                "obv_trend: price_window must be >= 1".into(),
            ));
        }
        let valid = |w: f64| w.is_finite() && (0.0..=1.0).contains(&w);
        if !valid(self.strong_weight) || !valid(self.weak_weight) {
            return Err(StrategyError::InvalidParams(
                "obv_trend: weights must lie in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct ObvTrend {
    params: ObvTrendParams,
    /// Last target weight sent per symbol.
    target: HashMap<String, f64>,
}

impl ObvTrend {
    pub fn new(params: ObvTrendParams) -> Result<Self, StrategyError> {
        params.validate()?;
        Ok(Self {
            params,
            target: HashMap::new(),
        })
    }

    fn target_weight(&self, closes: &[f64], volumes: &[f64]) -> f64 {
        let obv = on_balance_volume(closes, volumes);
        let obv_sma = mean(&obv[obv.len() - self.params.obv_window..]);
        let obv_bullish = obv[obv.len() - 1] > obv_sma;

        let trend_confirmed = closes.len() >= self.params.price_window
            && closes[closes.len() - 1] > mean(&closes[closes.len() - self.params.price_window..]);

        match (obv_bullish, trend_confirmed) {
            (true, true) => self.params.strong_weight,
            (true, false) => self.params.weak_weight,
            (false, _) => 0.0,
        }
    }
}

impl Strategy for ObvTrend {
    fn name(&self) -> &str {
        "obv_trend"
    }

    fn on_market_event(
        &mut self,
        event: &MarketEvent,
        feed: &BarFeed,
        queue: &mut EventQueue,
    ) -> Result<(), StrategyError> {
        let lookback = self.params.obv_window + CONTEXT_BARS;
        for symbol in feed.symbols() {
            let closes = feed.latest_values(symbol, Field::Close, lookback);
            if closes.len() < self.params.obv_window + 2 {
                continue;
            }
            let volumes = feed.latest_values(symbol, Field::Volume, lookback);
            let target = self.target_weight(&closes, &volumes);

            let previous = self.target.get(symbol).copied().unwrap_or(0.0);
            if (target - previous).abs() <= TIER_EPSILON {
                continue;
            }
            self.target.insert(symbol.to_string(), target);
            debug!(symbol, previous, target, date = %event.timestamp, "obv_trend target change");
            queue.push(SignalEvent::new(
                symbol,
                event.timestamp,
                SignalType::Adjust,
                target,
            ));
        }
        Ok(())
    }
}

/// Cumulative signed volume, starting at 0 on the first bar.
fn on_balance_volume(closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    let mut obv = Vec::with_capacity(closes.len());
    let mut running = 0.0;
    obv.push(running);
    for i in 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            running += volumes[i];
        } else if change < 0.0 {
            running -= volumes[i];
        }
        obv.push(running);
    }
    obv
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
