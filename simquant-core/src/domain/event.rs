//! Event model — the closed set of messages that flow through a run.
//!
//! Every component talks to every other component only through these events.
//! The engine dispatches on the variant with an exhaustive `match`, so adding
//! a variant is a compile error until every stage handles it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a strategy wants the portfolio to do with a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    /// Enter (or top up to) a long position.
    Long,
    /// Flatten whatever is held.
    Exit,
    /// Move the position toward the size implied by `strength`.
    Adjust,
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalType::Long => f.write_str("LONG"),
            SignalType::Exit => f.write_str("EXIT"),
            SignalType::Adjust => f.write_str("ADJUST"),
        }
    }
}

/// Order / fill direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// +1 for buys, -1 for sells.
    pub fn sign(&self) -> i64 {
        match self {
            Direction::Buy => 1,
            Direction::Sell => -1,
        }
    }

    /// Direction that reduces a position of the given sign to zero.
    pub fn closing(position: i64) -> Self {
        if position > 0 {
            Direction::Sell
        } else {
            Direction::Buy
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => f.write_str("BUY"),
            Direction::Sell => f.write_str("SELL"),
        }
    }
}

/// A new date-step is available for all tracked symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub timestamp: NaiveDate,
}

/// Trade intent emitted by a strategy.
///
/// `strength` is read according to the portfolio's sizing policy; see
/// [`crate::portfolio::StrengthContract`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub symbol: String,
    pub timestamp: NaiveDate,
    pub signal_type: SignalType,
    pub strength: f64,
}

impl SignalEvent {
    pub fn new(
        symbol: impl Into<String>,
        timestamp: NaiveDate,
        signal_type: SignalType,
        strength: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            signal_type,
            strength,
        }
    }
}

/// Market order sent from the portfolio to the execution handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub timestamp: NaiveDate,
    pub symbol: String,
    pub quantity: u64,
    pub direction: Direction,
}

/// Result of executing an order.
///
/// `fill_price = None` means the fill happened at the bar close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub timestamp: NaiveDate,
    pub symbol: String,
    pub exchange: String,
    pub quantity: u64,
    pub direction: Direction,
    pub fill_price: Option<f64>,
    pub commission: f64,
}

/// Tagged union of everything that can sit on the event queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    Market(MarketEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

impl Event {
    pub fn timestamp(&self) -> NaiveDate {
        match self {
            Event::Market(e) => e.timestamp,
            Event::Signal(e) => e.timestamp,
            Event::Order(e) => e.timestamp,
            Event::Fill(e) => e.timestamp,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Market(_) => "MARKET",
            Event::Signal(_) => "SIGNAL",
            Event::Order(_) => "ORDER",
            Event::Fill(_) => "FILL",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Market(e) => write!(f, "MARKET {}", e.timestamp),
            Event::Signal(e) => write!(
                f,
                "SIGNAL {} {} {} strength={}",
                e.timestamp, e.symbol, e.signal_type, e.strength
            ),
            Event::Order(e) => write!(
                f,
                "ORDER {} {} {} {}",
                e.timestamp, e.symbol, e.direction, e.quantity
            ),
            Event::Fill(e) => write!(
                f,
                "FILL {} {} {} {} @ {} commission={:.2}",
                e.timestamp,
                e.symbol,
                e.direction,
                e.quantity,
                e.fill_price
                    .map(|p| format!("{p:.4}"))
                    .unwrap_or_else(|| "close".into()),
                e.commission
            ),
        }
    }
}

impl From<MarketEvent> for Event {
    fn from(e: MarketEvent) -> Self {
        Event::Market(e)
    }
}

impl From<SignalEvent> for Event {
    fn from(e: SignalEvent) -> Self {
        Event::Signal(e)
    }
}

impl From<OrderEvent> for Event {
    fn from(e: OrderEvent) -> Self {
        Event::Order(e)
    }
}

impl From<FillEvent> for Event {
    fn from(e: FillEvent) -> Self {
        Event::Fill(e)
    }
}
