//! Dual simple-moving-average crossover.
//!
//! LONG when SMA(short) rises above SMA(long) while out of the market,
//! EXIT when it falls below while in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{skip_if_short, Stance, Strategy, StrategyError};
use crate::data::BarFeed;
use crate::domain::{Field, MarketEvent, SignalEvent, SignalType};
use crate::queue::EventQueue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaCrossParams {
    pub short_window: usize,
    pub long_window: usize,
}

impl Default for MaCrossParams {
    fn default() -> Self {
        Self {
            short_window: 10,
            long_window: 50,
        }
    }
}

impl MaCrossParams {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.short_window == 0 {
            return Err(StrategyError::InvalidParams(
                "ma_cross: short_window must be >= 1".into(),
            ));
        }
        if self.long_window <= self.short_window {
            return Err(StrategyError::InvalidParams(format!(
                "ma_cross: long_window ({}) must be > short_window ({})",
                self.long_window, self.short_window
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct MaCross {
    params: MaCrossParams,
    stance: HashMap<String, Stance>,
}

impl MaCross {
    pub fn new(params: MaCrossParams) -> Result<Self, StrategyError> {
        params.validate()?;
        Ok(Self {
            params,
            stance: HashMap::new(),
        })
    }
}

impl Strategy for MaCross {
    fn name(&self) -> &str {
        "ma_cross"
    }

    fn on_market_event(
        &mut self,
        event: &MarketEvent,
        feed: &BarFeed,
        queue: &mut EventQueue,
    ) -> Result<(), StrategyError> {
        for symbol in feed.symbols() {
            let Some(closes) =
                skip_if_short(feed.window(symbol, Field::Close, self.params.long_window))?
            else {
                continue;
            };
            let short_sma = mean(&closes[closes.len() - self.params.short_window..]);
            let long_sma = mean(&closes);

            let stance = self.stance.entry(symbol.to_string()).or_default();
            let signal_type = match *stance {
                Stance::Out if short_sma > long_sma => SignalType::Long,
                Stance::Long if short_sma < long_sma => SignalType::Exit,
                _ => continue,
            };
            *stance = match signal_type {
                SignalType::Long => Stance::Long,
                _ => Stance::Out,
            };
            debug!(symbol, %signal_type, short_sma, long_sma, date = %event.timestamp, "ma_cross signal");
            queue.push(SignalEvent::new(symbol, event.timestamp, signal_type, 1.0));
        }
        Ok(())
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
