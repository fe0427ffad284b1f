//! Portfolio — signals to orders, fills to positions and cash, daily marks.
//!
//! Positions are signed integer share counts per symbol. Cash and positions
//! change only in [`Portfolio::update_fill`]; the equity curve grows only in
//! [`Portfolio::mark_to_market`]. Symbols are iterated in construction order
//! so every run over the same inputs produces the same curve.

pub mod equity;
pub mod sizing;

pub use equity::{EquityCurve, EquityRow};
pub use sizing::{NoTrade, SizingDecision, SizingInput, SizingPolicy, StrengthContract};

use std::collections::BTreeMap;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::BarFeed;
use crate::diagnostics::Diagnostics;
use crate::domain::{Direction, FillEvent, OrderEvent, SignalEvent, SignalType, TradeAudit};
use crate::queue::EventQueue;

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("invalid sizing policy: {0}")]
    InvalidSizing(String),

    #[error("initial capital must be positive and finite, got {0}")]
    InvalidCapital(f64),

    #[error("portfolio needs at least one symbol")]
    NoSymbols,

    #[error("fill for untracked symbol '{0}'")]
    UnknownSymbol(String),

    #[error("no price to settle fill for '{symbol}' on {date}")]
    NoFillPrice { symbol: String, date: NaiveDate },
}

/// Everything the portfolio hands back when a run ends.
#[derive(Debug, Clone)]
pub struct PortfolioOutcome {
    pub equity_curve: EquityCurve,
    pub trades: Vec<TradeAudit>,
    pub diagnostics: Diagnostics,
    pub positions: BTreeMap<String, i64>,
    pub cash: f64,
    pub total_commission: f64,
}

#[derive(Debug)]
pub struct Portfolio {
    symbols: Vec<String>,
    positions: BTreeMap<String, i64>,
    initial_capital: f64,
    cash: f64,
    total_commission: f64,
    sizing: SizingPolicy,
    curve: EquityCurve,
    trades: Vec<TradeAudit>,
    diagnostics: Diagnostics,
}

impl Portfolio {
    /// Flat portfolio holding `initial_capital` in cash, with the opening
    /// equity row dated `start_date`.
    pub fn new(
        symbols: Vec<String>,
        initial_capital: f64,
        start_date: NaiveDate,
        sizing: SizingPolicy,
    ) -> Result<Self, PortfolioError> {
        if symbols.is_empty() {
            return Err(PortfolioError::NoSymbols);
        }
        if !(initial_capital.is_finite() && initial_capital > 0.0) {
            return Err(PortfolioError::InvalidCapital(initial_capital));
        }
        sizing.validate().map_err(PortfolioError::InvalidSizing)?;

        let positions: BTreeMap<String, i64> = symbols.iter().map(|s| (s.clone(), 0)).collect();
        let mut curve = EquityCurve::default();
        curve.push(EquityRow {
            date: start_date,
            values: symbols.iter().map(|s| (s.clone(), 0.0)).collect(),
            cash: initial_capital,
            commission: 0.0,
            total: initial_capital,
        });

        Ok(Self {
            symbols,
            positions,
            initial_capital,
            cash: initial_capital,
            total_commission: 0.0,
            sizing,
            curve,
            trades: Vec::new(),
            diagnostics: Diagnostics::default(),
        })
    }

    // ─── Event handlers ──────────────────────────────────────────────

    /// Turn a signal into at most one market order.
    pub fn update_signal(
        &mut self,
        signal: &SignalEvent,
        feed: &BarFeed,
        queue: &mut EventQueue,
    ) -> Result<(), PortfolioError> {
        let symbol = signal.symbol.as_str();
        let position = self.position(symbol);

        if signal.signal_type == SignalType::Exit && position == 0 {
            self.diagnostics.exit_noops += 1;
            debug!(symbol, date = %signal.timestamp, "EXIT while flat, ignored");
            return Ok(());
        }

        let Some(price) = feed.current_price(symbol) else {
            self.diagnostics.invalid_price_signals += 1;
            warn!(
                symbol,
                date = %signal.timestamp,
                signal_type = %signal.signal_type,
                "no valid price for signal, dropped"
            );
            return Ok(());
        };

        if signal.signal_type == SignalType::Exit {
            self.send_order(queue, signal, Direction::closing(position), position.unsigned_abs());
            return Ok(());
        }

        let input = SizingInput {
            price,
            position,
            cash: self.cash,
            total_equity: self.total_equity(feed),
            strength: signal.strength,
        };
        match self.sizing.size(&input) {
            SizingDecision::Order {
                direction,
                quantity,
                clipped,
            } => {
                if clipped {
                    self.diagnostics.cash_clipped_orders += 1;
                    warn!(symbol, quantity, cash = self.cash, price, "order clipped to available cash");
                }
                self.send_order(queue, signal, direction, quantity);
            }
            SizingDecision::Skip(NoTrade::Unaffordable) => {
                self.diagnostics.dropped_unaffordable += 1;
                warn!(symbol, cash = self.cash, price, "cannot afford a single unit, order dropped");
            }
            SizingDecision::Skip(reason) => {
                self.diagnostics.ignored_signals += 1;
                debug!(symbol, ?reason, strength = signal.strength, "signal sized to no trade");
            }
        }
        Ok(())
    }

    /// Apply a fill to position, cash, commission and the trade log.
    pub fn update_fill(&mut self, fill: &FillEvent, feed: &BarFeed) -> Result<(), PortfolioError> {
        let Some(position) = self.positions.get_mut(&fill.symbol) else {
            return Err(PortfolioError::UnknownSymbol(fill.symbol.clone()));
        };
        let price = fill
            .fill_price
            .filter(|p| p.is_finite() && *p > 0.0)
            .or_else(|| feed.current_price(&fill.symbol))
            .ok_or_else(|| PortfolioError::NoFillPrice {
                symbol: fill.symbol.clone(),
                date: fill.timestamp,
            })?;

        let sign = fill.direction.sign();
        *position += sign * fill.quantity as i64;
        self.cash -= sign as f64 * price * fill.quantity as f64 + fill.commission;
        self.total_commission += fill.commission;

        debug!(
            symbol = %fill.symbol,
            direction = %fill.direction,
            quantity = fill.quantity,
            price,
            commission = fill.commission,
            cash = self.cash,
            position = *position,
            "fill applied"
        );

        self.trades.push(TradeAudit {
            date: fill.timestamp,
            symbol: fill.symbol.clone(),
            direction: fill.direction,
            quantity: fill.quantity,
            price,
            commission: fill.commission,
        });
        Ok(())
    }

    /// Append one equity row for `date`.
    ///
    /// A held symbol without a valid close keeps the prior row's value.
    pub fn mark_to_market(&mut self, date: NaiveDate, feed: &BarFeed) {
        let mut values = BTreeMap::new();
        let mut total = self.cash;
        for symbol in &self.symbols {
            let position = self.positions.get(symbol).copied().unwrap_or(0);
            let value = if position == 0 {
                0.0
            } else {
                match feed.current_price(symbol) {
                    Some(price) => position as f64 * price,
                    None => self.curve.last_value(symbol).unwrap_or(0.0),
                }
            };
            total += value;
            values.insert(symbol.clone(), value);
        }
        self.curve.push(EquityRow {
            date,
            values,
            cash: self.cash,
            commission: self.total_commission,
            total,
        });
    }

    fn send_order(
        &self,
        queue: &mut EventQueue,
        signal: &SignalEvent,
        direction: Direction,
        quantity: u64,
    ) {
        debug!(
            symbol = %signal.symbol,
            %direction,
            quantity,
            signal_type = %signal.signal_type,
            "order"
        );
        queue.push(OrderEvent {
            timestamp: signal.timestamp,
            symbol: signal.symbol.clone(),
            quantity,
            direction,
        });
    }

    // ─── Queries ─────────────────────────────────────────────────────

    pub fn position(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    pub fn positions(&self) -> &BTreeMap<String, i64> {
        &self.positions
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn total_commission(&self) -> f64 {
        self.total_commission
    }

    pub fn sizing(&self) -> &SizingPolicy {
        &self.sizing
    }

    pub fn strength_contract(&self) -> StrengthContract {
        self.sizing.strength_contract()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn equity_curve(&self) -> &EquityCurve {
        &self.curve
    }

    pub fn trades(&self) -> &[TradeAudit] {
        &self.trades
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Cash plus positions at current prices, falling back to the last
    /// marked value for symbols without one.
    pub fn total_equity(&self, feed: &BarFeed) -> f64 {
        self.cash
            + self
                .positions
                .iter()
                .filter(|(_, q)| **q != 0)
                .map(|(s, q)| match feed.current_price(s) {
                    Some(p) => *q as f64 * p,
                    None => self.curve.last_value(s).unwrap_or(0.0),
                })
                .sum::<f64>()
    }

    /// Freeze the run: move the curve, trade log and counters out.
    pub fn finish(self) -> PortfolioOutcome {
        PortfolioOutcome {
            equity_curve: self.curve,
            trades: self.trades,
            diagnostics: self.diagnostics,
            positions: self.positions,
            cash: self.cash,
            total_commission: self.total_commission,
        }
    }
}
