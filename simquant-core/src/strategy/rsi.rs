//! RSI mean reversion.
//!
//! RSI here is the simple-average variant computed over the last
//! `period + 10` closes: mean gain over mean loss across every close-to-close
//! change in that window. LONG below `buy_threshold` while out, EXIT above
//! `sell_threshold` while in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Stance, Strategy, StrategyError};
use crate::data::BarFeed;
use crate::domain::{Field, MarketEvent, SignalEvent, SignalType};
use crate::queue::EventQueue;

/// Extra closes fetched beyond `period`.
const LOOKBACK_BUFFER: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiParams {
    pub period: usize,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            period: 14,
            buy_threshold: 30.0,
            sell_threshold: 70.0,
        }
    }
}

impl RsiParams {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.period == 0 {
            return Err(StrategyError::InvalidParams("rsi: period must be >= 1".into()));
        }
        let in_range = |t: f64| (0.0..=100.0).contains(&t);
        if !in_range(self.buy_threshold) || !in_range(self.sell_threshold) {
            return Err(StrategyError::InvalidParams(
                "rsi: thresholds must lie in [0, 100]".into(),
            ));
        }
        if self.buy_threshold >= self.sell_threshold {
            return Err(StrategyError::InvalidParams(format!(
                "rsi: buy_threshold ({}) must be below sell_threshold ({})",
                self.buy_threshold, self.sell_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Rsi {
    params: RsiParams,
    stance: HashMap<String, Stance>,
}

impl Rsi {
    pub fn new(params: RsiParams) -> Result<Self, StrategyError> {
        params.validate()?;
        Ok(Self {
            params,
            stance: HashMap::new(),
        })
    }
}

impl Strategy for Rsi {
    fn name(&self) -> &str {
        "rsi"
    }

    fn on_market_event(
        &mut self,
        event: &MarketEvent,
        feed: &BarFeed,
        queue: &mut EventQueue,
    ) -> Result<(), StrategyError> {
        let lookback = self.params.period + LOOKBACK_BUFFER;
        for symbol in feed.symbols() {
            let closes = feed.latest_values(symbol, Field::Close, lookback);
            if closes.len() < self.params.period + 1 {
                continue;
            }
            let rsi = simple_rsi(&closes);

            let stance = self.stance.entry(symbol.to_string()).or_default();
            let signal_type = match *stance {
                Stance::Out if rsi < self.params.buy_threshold => SignalType::Long,
                Stance::Long if rsi > self.params.sell_threshold => SignalType::Exit,
                _ => continue,
            };
            *stance = if signal_type == SignalType::Long {
                Stance::Long
            } else {
                Stance::Out
            };
            debug!(symbol, %signal_type, rsi, date = %event.timestamp, "rsi signal");
            queue.push(SignalEvent::new(symbol, event.timestamp, signal_type, 1.0));
        }
        Ok(())
    }
}

/// Simple-average RSI over all changes in `closes`.
///
/// No losses gives 100 (50 if the window is completely flat).
fn simple_rsi(closes: &[f64]) -> f64 {
    let n = closes.len().saturating_sub(1);
    if n == 0 {
        return 50.0;
    }
    let (gains, losses) = closes
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });
    let avg_gain = gains / n as f64;
    let avg_loss = losses / n as f64;
    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}
