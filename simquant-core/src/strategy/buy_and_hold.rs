//! Buy and hold: one LONG per symbol on its first visible bar.

use std::collections::HashSet;

use super::{Strategy, StrategyError};
use crate::data::BarFeed;
use crate::domain::{MarketEvent, SignalEvent, SignalType};
use crate::queue::EventQueue;

#[derive(Debug, Default)]
pub struct BuyAndHold {
    entered: HashSet<String>,
}

impl BuyAndHold {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn on_market_event(
        &mut self,
        event: &MarketEvent,
        feed: &BarFeed,
        queue: &mut EventQueue,
    ) -> Result<(), StrategyError> {
        for symbol in feed.symbols() {
            if feed.latest_bar(symbol).is_none() || self.entered.contains(symbol) {
                continue;
            }
            self.entered.insert(symbol.to_string());
            queue.push(SignalEvent::new(
                symbol,
                event.timestamp,
                SignalType::Long,
                1.0,
            ));
        }
        Ok(())
    }
}
