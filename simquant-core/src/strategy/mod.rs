//! Strategies — pure reactive logic from market events to trade signals.
//!
//! A strategy sees the bar feed through its windowed queries and the event
//! queue it may push `SignalEvent`s onto. It never sees the portfolio, so
//! it cannot size, and it owns only its own per-symbol intent state.

pub mod buy_and_hold;
pub mod factory;
pub mod ma_cross;
pub mod obv_trend;
pub mod rsi;

pub use buy_and_hold::BuyAndHold;
pub use factory::StrategySpec;
pub use ma_cross::{MaCross, MaCrossParams};
pub use obv_trend::{ObvTrend, ObvTrendParams};
pub use rsi::{Rsi, RsiParams};

use crate::data::{BarFeed, FeedError};
use crate::domain::MarketEvent;
use crate::queue::EventQueue;
use thiserror::Error;

/// Errors a strategy can raise. Any of these stops the run.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("invalid strategy parameters: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// Turns one `MarketEvent` into zero or more `SignalEvent`s.
///
/// Called exactly once per date-step. Implementations skip a symbol whose
/// history is too short rather than failing the run.
pub trait Strategy: Send {
    fn name(&self) -> &str;

    fn on_market_event(
        &mut self,
        event: &MarketEvent,
        feed: &BarFeed,
        queue: &mut EventQueue,
    ) -> Result<(), StrategyError>;
}

/// Whether a strategy currently wants to be in a symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Stance {
    #[default]
    Out,
    Long,
}

/// Swallow recoverable feed errors, propagate the rest.
pub(crate) fn skip_if_short<T>(result: Result<T, FeedError>) -> Result<Option<T>, StrategyError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_recoverable() => Ok(None),
        Err(e) => Err(e.into()),
    }
}
