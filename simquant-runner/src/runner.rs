//! Backtest runner — wires config, feed, strategy, portfolio and execution.
//!
//! Two entry points:
//! - `run_backtest()`: loads CSVs from `backtest.data_dir`, then runs. Used by the CLI.
//! - `run_from_series()`: takes pre-loaded bars, no I/O. Used by tests and benches.

use std::sync::atomic::AtomicBool;

use thiserror::Error;
use tracing::{info, warn};

use simquant_core::data::{BarFeed, FeedError};
use simquant_core::domain::Bar;
use simquant_core::engine::{BacktestEngine, EngineError};
use simquant_core::execution::SimulatedExecutionHandler;
use simquant_core::portfolio::{Portfolio, PortfolioError};
use simquant_core::strategy::StrategyError;

use crate::config::{BacktestConfig, ConfigError};
use crate::report::BacktestReport;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Feed(#[from] FeedError),
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
    #[error("portfolio error: {0}")]
    Portfolio(#[from] PortfolioError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl RunError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunError::Engine(EngineError::Cancelled { .. }))
    }
}

/// Run a backtest from a config, loading `<data_dir>/<SYMBOL>.csv` per symbol.
pub fn run_backtest(
    config: &BacktestConfig,
    cancel: Option<&AtomicBool>,
) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let feed = BarFeed::from_csv_dir(
        &config.backtest.data_dir,
        &config.backtest.symbols,
        config.date_range()?,
    )?;
    run_with_feed(config, feed, cancel)
}

/// Run a backtest over pre-loaded bars, in the config's symbol order.
///
/// Symbols in the config without a series fail with `DataNotFound`.
pub fn run_from_series(
    config: &BacktestConfig,
    mut series: Vec<(String, Vec<Bar>)>,
    cancel: Option<&AtomicBool>,
) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let mut ordered = Vec::with_capacity(config.backtest.symbols.len());
    for symbol in &config.backtest.symbols {
        let Some(pos) = series.iter().position(|(s, _)| s == symbol) else {
            return Err(FeedError::DataNotFound {
                symbol: symbol.clone(),
                path: config.backtest.data_dir.join(format!("{symbol}.csv")),
            }
            .into());
        };
        ordered.push(series.swap_remove(pos));
    }
    let feed = BarFeed::from_series(ordered, config.date_range()?)?;
    run_with_feed(config, feed, cancel)
}

fn run_with_feed(
    config: &BacktestConfig,
    feed: BarFeed,
    cancel: Option<&AtomicBool>,
) -> Result<BacktestReport, RunError> {
    let run_id = config.run_id()?;
    if !config.strength_contract_matches() {
        warn!(
            strategy = config.strategy.name(),
            sizing = config.sizing.name(),
            "strategy and sizing policy read signal strength differently"
        );
    }

    let Some(start_date) = feed.start_date() else {
        return Err(FeedError::EmptyRange.into());
    };
    let strategy = config.strategy.build()?;
    let portfolio = Portfolio::new(
        feed.symbol_list(),
        config.backtest.initial_capital,
        start_date,
        config.sizing.clone(),
    )?;
    let execution = SimulatedExecutionHandler::new(config.commission.build());

    info!(
        run_id = &run_id[..12],
        symbols = ?config.backtest.symbols,
        bars = feed.total_bars(),
        "running backtest"
    );
    let output = BacktestEngine::new(feed, strategy, portfolio, Box::new(execution))
        .with_config(config.engine_config())
        .run(cancel)?;

    Ok(BacktestReport::new(run_id, config.clone(), output))
}
