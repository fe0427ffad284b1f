//! SimQuant Core — event-driven daily-bar backtesting engine.
//!
//! This crate contains everything a single run needs:
//! - Domain types (bars, events, trade audit records)
//! - The FIFO event queue shared by all components of a run
//! - CSV ingest, the lockstep bar feed and a synthetic data generator
//! - Strategies (moving-average cross, RSI, OBV trend, buy-and-hold)
//! - Portfolio with pluggable sizing, mark-to-market and equity curve
//! - Simulated execution with commission models
//! - The advance/drain engine loop and performance metrics

pub mod data;
pub mod diagnostics;
pub mod domain;
pub mod engine;
pub mod execution;
pub mod metrics;
pub mod portfolio;
pub mod queue;
pub mod strategy;

pub use data::{BarFeed, DateRange, FeedError};
pub use diagnostics::Diagnostics;
pub use domain::{Bar, Direction, Event, Field, SignalType, TradeAudit};
pub use engine::{BacktestEngine, BacktestOutput, EngineConfig, EngineError, LoopStats};
pub use execution::{CommissionSpec, ExecutionHandler, SimulatedExecutionHandler};
pub use metrics::PerformanceStats;
pub use portfolio::{EquityCurve, EquityRow, Portfolio, SizingPolicy, StrengthContract};
pub use queue::EventQueue;
pub use strategy::{Strategy, StrategySpec};
