//! Counters for every recoverable condition seen during a run.

use serde::{Deserialize, Serialize};

/// Recoverable conditions are absorbed, logged and counted here; they never
/// stop a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Signals dropped because the symbol had no usable price.
    pub invalid_price_signals: u64,
    /// Buy orders reduced to what cash could cover.
    pub cash_clipped_orders: u64,
    /// Buy orders dropped entirely because not even one unit was affordable.
    pub dropped_unaffordable: u64,
    /// EXIT signals received while already flat.
    pub exit_noops: u64,
    /// Signals that sized to no trade (non-positive conviction, zero delta,
    /// already at target).
    pub ignored_signals: u64,
    /// Strict feed queries refused for lack of history.
    pub insufficient_history: u64,
}

impl Diagnostics {
    /// Total number of recoverable conditions.
    pub fn total(&self) -> u64 {
        self.invalid_price_signals
            + self.cash_clipped_orders
            + self.dropped_unaffordable
            + self.exit_noops
            + self.ignored_signals
            + self.insufficient_history
    }

    /// `(label, count)` rows for reports.
    pub fn rows(&self) -> [(&'static str, u64); 6] {
        [
            ("Invalid-price signals", self.invalid_price_signals),
            ("Cash-clipped orders", self.cash_clipped_orders),
            ("Unaffordable orders dropped", self.dropped_unaffordable),
            ("EXIT while flat", self.exit_noops),
            ("Signals with no trade", self.ignored_signals),
            ("Insufficient-history queries", self.insufficient_history),
        ]
    }
}
