//! Backtest engine — the single-threaded advance/drain loop.
//!
//! Each cycle has two phases:
//!
//! 1. Advance: the feed reveals the next date and pushes one `MarketEvent`
//!    (or reports exhaustion, which ends the run).
//! 2. Drain: events are popped FIFO and dispatched by variant until the
//!    queue is empty. `Market` runs the strategy, `Signal` goes to the
//!    portfolio, `Order` to the execution handler, `Fill` back to the
//!    portfolio. The date is marked to market once the queue is empty, so
//!    the equity row reflects every fill of that date.
//!
//! Any dispatch error ends the run and carries the offending event.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::data::BarFeed;
use crate::diagnostics::Diagnostics;
use crate::domain::{Event, TradeAudit};
use crate::execution::{ExecutionError, ExecutionHandler};
use crate::metrics::PerformanceStats;
use crate::portfolio::{EquityCurve, Portfolio, PortfolioError};
use crate::queue::EventQueue;
use crate::strategy::{Strategy, StrategyError};

/// Loop settings that do not change results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pause between date-steps. Affects wall-clock speed only.
    pub heartbeat: Option<Duration>,
}

/// Error from the component an event was dispatched to.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("strategy: {0}")]
    Strategy(#[from] StrategyError),
    #[error("portfolio: {0}")]
    Portfolio(#[from] PortfolioError),
    #[error("execution: {0}")]
    Execution(#[from] ExecutionError),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("run failed while handling [{event}]: {source}")]
    ExecutionFailure {
        event: Box<Event>,
        #[source]
        source: DispatchError,
    },

    #[error("run cancelled after {dates_processed} date-steps")]
    Cancelled { dates_processed: u64 },
}

/// Event counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopStats {
    pub dates: u64,
    pub market_events: u64,
    pub signal_events: u64,
    pub order_events: u64,
    pub fill_events: u64,
}

/// Everything a finished run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutput {
    pub strategy: String,
    pub symbols: Vec<String>,
    pub equity_curve: EquityCurve,
    pub stats: PerformanceStats,
    pub trades: Vec<TradeAudit>,
    pub diagnostics: Diagnostics,
    pub loop_stats: LoopStats,
    pub final_positions: BTreeMap<String, i64>,
    pub final_cash: f64,
    pub total_commission: f64,
}

/// Owns every component of one run. Consumed by [`run`](Self::run).
pub struct BacktestEngine {
    feed: BarFeed,
    strategy: Box<dyn Strategy>,
    portfolio: Portfolio,
    execution: Box<dyn ExecutionHandler>,
    queue: EventQueue,
    config: EngineConfig,
    stats: LoopStats,
}

impl BacktestEngine {
    pub fn new(
        feed: BarFeed,
        strategy: Box<dyn Strategy>,
        portfolio: Portfolio,
        execution: Box<dyn ExecutionHandler>,
    ) -> Self {
        Self {
            feed,
            strategy,
            portfolio,
            execution,
            queue: EventQueue::new(),
            config: EngineConfig::default(),
            stats: LoopStats::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Run to completion.
    ///
    /// `cancel` is checked once per cycle; seeing it set ends the run with
    /// `EngineError::Cancelled`.
    pub fn run(mut self, cancel: Option<&AtomicBool>) -> Result<BacktestOutput, EngineError> {
        let started = Instant::now();
        info!(
            strategy = self.strategy.name(),
            symbols = self.portfolio.symbols().len(),
            sizing = self.portfolio.sizing().name(),
            "backtest started"
        );

        loop {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                info!(dates = self.stats.dates, "backtest cancelled");
                return Err(EngineError::Cancelled {
                    dates_processed: self.stats.dates,
                });
            }
            if !self.step()? {
                break;
            }
            if let Some(pause) = self.config.heartbeat {
                std::thread::sleep(pause);
            }
        }

        let output = self.finish();
        info!(
            strategy = %output.strategy,
            dates = output.loop_stats.dates,
            fills = output.loop_stats.fill_events,
            total_return = output.stats.total_return,
            sharpe = output.stats.sharpe,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "backtest finished"
        );
        Ok(output)
    }

    /// One advance/drain cycle. Returns `false` once the feed is exhausted.
    pub fn step(&mut self) -> Result<bool, EngineError> {
        if !self.feed.advance(&mut self.queue) {
            return Ok(false);
        }
        self.stats.dates += 1;

        let mut mark_date: Option<NaiveDate> = None;
        while let Some(event) = self.queue.pop() {
            if let Err(source) = self.dispatch(&event, &mut mark_date) {
                return Err(EngineError::ExecutionFailure {
                    event: Box::new(event),
                    source,
                });
            }
        }
        if let Some(date) = mark_date {
            self.portfolio.mark_to_market(date, &self.feed);
        }
        Ok(true)
    }

    fn dispatch(
        &mut self,
        event: &Event,
        mark_date: &mut Option<NaiveDate>,
    ) -> Result<(), DispatchError> {
        match event {
            Event::Market(market) => {
                self.stats.market_events += 1;
                self.strategy
                    .on_market_event(market, &self.feed, &mut self.queue)?;
                *mark_date = Some(market.timestamp);
            }
            Event::Signal(signal) => {
                self.stats.signal_events += 1;
                debug!(%event, "dispatch");
                self.portfolio
                    .update_signal(signal, &self.feed, &mut self.queue)?;
            }
            Event::Order(order) => {
                self.stats.order_events += 1;
                debug!(%event, "dispatch");
                self.execution.execute(order, &self.feed, &mut self.queue)?;
            }
            Event::Fill(fill) => {
                self.stats.fill_events += 1;
                debug!(%event, "dispatch");
                self.portfolio.update_fill(fill, &self.feed)?;
            }
        }
        Ok(())
    }

    // ─── Inspection ──────────────────────────────────────────────────

    pub fn feed(&self) -> &BarFeed {
        &self.feed
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn loop_stats(&self) -> LoopStats {
        self.stats
    }

    fn finish(self) -> BacktestOutput {
        let strategy = self.strategy.name().to_string();
        let symbols = self.portfolio.symbols().to_vec();
        let insufficient_history = self.feed.insufficient_history_count();
        let outcome = self.portfolio.finish();

        let mut diagnostics = outcome.diagnostics;
        diagnostics.insufficient_history = insufficient_history;

        BacktestOutput {
            strategy,
            symbols,
            stats: PerformanceStats::compute(&outcome.equity_curve),
            equity_curve: outcome.equity_curve,
            trades: outcome.trades,
            diagnostics,
            loop_stats: self.stats,
            final_positions: outcome.positions,
            final_cash: outcome.cash,
            total_commission: outcome.total_commission,
        }
    }
}
