use crate::domain::event::Direction;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the trade audit log, appended on every fill.
///
/// Reporting only: the portfolio never reads these back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAudit {
    pub date: NaiveDate,
    pub symbol: String,
    pub direction: Direction,
    pub quantity: u64,
    pub price: f64,
    pub commission: f64,
}

impl TradeAudit {
    /// Signed notional: positive for buys (cash out), negative for sells.
    pub fn signed_notional(&self) -> f64 {
        self.direction.sign() as f64 * self.price * self.quantity as f64
    }
}
