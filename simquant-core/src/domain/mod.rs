//! Domain types for SimQuant

pub mod bar;
pub mod event;
pub mod trade;

pub use bar::{Bar, Field};
pub use event::{Direction, Event, FillEvent, MarketEvent, OrderEvent, SignalEvent, SignalType};
pub use trade::TradeAudit;

/// Symbol type alias
pub type Symbol = String;
