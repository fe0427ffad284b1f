//! Execution — orders in, fills out.
//!
//! The simulated handler fills every order completely, immediately, at the
//! current bar close. No latency, no partial fills, no slippage.

pub mod commission;

pub use commission::{
    CommissionModel, CommissionSpec, FlatCommission, PerShareCommission, ZeroCommission,
};

use std::collections::HashMap;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use crate::data::BarFeed;
use crate::domain::{FillEvent, OrderEvent};
use crate::queue::EventQueue;

const DEFAULT_EXCHANGE: &str = "ARCA";

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("no valid price to fill '{symbol}' on {date}")]
    NoPrice { symbol: String, date: NaiveDate },

    #[error("zero-quantity order for '{0}'")]
    EmptyOrder(String),
}

/// Converts an `OrderEvent` into one or more `FillEvent`s on the queue.
pub trait ExecutionHandler: Send {
    fn execute(
        &mut self,
        order: &OrderEvent,
        feed: &BarFeed,
        queue: &mut EventQueue,
    ) -> Result<(), ExecutionError>;
}

/// One full fill per order at the current close.
#[derive(Debug)]
pub struct SimulatedExecutionHandler {
    exchange: String,
    commission: Box<dyn CommissionModel>,
    price_overrides: HashMap<String, f64>,
}

impl Default for SimulatedExecutionHandler {
    fn default() -> Self {
        Self::new(Box::new(PerShareCommission::default()))
    }
}

impl SimulatedExecutionHandler {
    pub fn new(commission: Box<dyn CommissionModel>) -> Self {
        Self {
            exchange: DEFAULT_EXCHANGE.to_string(),
            commission,
            price_overrides: HashMap::new(),
        }
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    /// Fill `symbol` at `price` instead of the close. The fill then carries
    /// an explicit `fill_price`.
    pub fn with_price_override(mut self, symbol: impl Into<String>, price: f64) -> Self {
        self.price_overrides.insert(symbol.into(), price);
        self
    }
}

impl ExecutionHandler for SimulatedExecutionHandler {
    fn execute(
        &mut self,
        order: &OrderEvent,
        feed: &BarFeed,
        queue: &mut EventQueue,
    ) -> Result<(), ExecutionError> {
        if order.quantity == 0 {
            return Err(ExecutionError::EmptyOrder(order.symbol.clone()));
        }
        let no_price = || ExecutionError::NoPrice {
            symbol: order.symbol.clone(),
            date: order.timestamp,
        };

        let fill_price = match self.price_overrides.get(&order.symbol) {
            Some(&p) if p.is_finite() && p > 0.0 => Some(p),
            Some(_) => return Err(no_price()),
            None => None,
        };
        let reference_price = match fill_price {
            Some(p) => p,
            None => feed.current_price(&order.symbol).ok_or_else(no_price)?,
        };
        let commission = self.commission.commission(order.quantity, reference_price);

        debug!(
            symbol = %order.symbol,
            direction = %order.direction,
            quantity = order.quantity,
            price = reference_price,
            commission,
            "simulated fill"
        );
        queue.push(FillEvent {
            timestamp: order.timestamp,
            symbol: order.symbol.clone(),
            exchange: self.exchange.clone(),
            quantity: order.quantity,
            direction: order.direction,
            fill_price,
            commission,
        });
        Ok(())
    }
}
