//! Universe scan — the same config run independently on each symbol.
//!
//! Every symbol gets its own feed, strategy, portfolio and engine; runs share
//! nothing but the read-only CSV directory and the cancel flag. Runs execute
//! in parallel on a rayon pool and are ranked by stability score.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::AtomicBool;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use simquant_core::metrics::PerformanceStats;

use crate::config::BacktestConfig;
use crate::runner::{run_backtest, RunError};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no symbols to scan")]
    NoSymbols,
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("scan cancelled")]
    Cancelled,
}

/// One symbol's result in a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEntry {
    pub symbol: String,
    pub stats: PerformanceStats,
    pub trade_count: usize,
    pub run_id: String,
}

/// Ranked successes plus the symbols that failed and why.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// Best stability score first.
    pub entries: Vec<ScanEntry>,
    pub failures: Vec<(String, String)>,
}

impl ScanOutcome {
    pub fn best(&self) -> Option<&ScanEntry> {
        self.entries.first()
    }
}

/// Run `config` once per symbol in `symbols` (or the config's own symbol
/// list when `symbols` is empty).
///
/// `threads` caps the pool size; `None` uses rayon's global pool. A failing
/// symbol is recorded in `failures` and does not stop the scan. A set cancel
/// flag ends the whole scan with `ScanError::Cancelled`.
pub fn scan_universe(
    config: &BacktestConfig,
    symbols: &[String],
    threads: Option<usize>,
    cancel: Option<&AtomicBool>,
) -> Result<ScanOutcome, ScanError> {
    let symbols = if symbols.is_empty() {
        &config.backtest.symbols[..]
    } else {
        symbols
    };
    if symbols.is_empty() {
        return Err(ScanError::NoSymbols);
    }
    info!(symbols = symbols.len(), strategy = config.strategy.name(), "scan started");

    let run_all = || -> Vec<(String, Result<ScanEntry, RunError>)> {
        symbols
            .par_iter()
            .map(|symbol| (symbol.clone(), run_one(config, symbol, cancel)))
            .collect()
    };
    let results = match threads {
        Some(n) if n > 0 => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()?
            .install(run_all),
        _ => run_all(),
    };

    let mut outcome = ScanOutcome::default();
    for (symbol, result) in results {
        match result {
            Ok(entry) => outcome.entries.push(entry),
            Err(e) if e.is_cancelled() => return Err(ScanError::Cancelled),
            Err(e) => {
                warn!(%symbol, error = %e, "scan run failed");
                outcome.failures.push((symbol, e.to_string()));
            }
        }
    }
    rank(&mut outcome.entries);

    info!(
        succeeded = outcome.entries.len(),
        failed = outcome.failures.len(),
        best = outcome.best().map(|e| e.symbol.as_str()).unwrap_or("-"),
        "scan finished"
    );
    Ok(outcome)
}

fn run_one(
    config: &BacktestConfig,
    symbol: &str,
    cancel: Option<&AtomicBool>,
) -> Result<ScanEntry, RunError> {
    let report = run_backtest(&config.for_single_symbol(symbol), cancel)?;
    Ok(ScanEntry {
        symbol: symbol.to_string(),
        stats: report.output.stats,
        trade_count: report.output.trades.len(),
        run_id: report.run_id,
    })
}

/// Stability descending; NaN last; ties broken by symbol for a stable order.
fn rank(entries: &mut [ScanEntry]) {
    entries.sort_by(|a, b| {
        let (x, y) = (a.stats.stability_score, b.stats.stability_score);
        match (x.is_nan(), y.is_nan()) {
            (true, true) => CmpOrdering::Equal,
            (true, false) => CmpOrdering::Greater,
            (false, true) => CmpOrdering::Less,
            (false, false) => y.partial_cmp(&x).unwrap_or(CmpOrdering::Equal),
        }
        .then_with(|| a.symbol.cmp(&b.symbol))
    });
}

/// Fixed-width ranking table for terminal output.
pub fn render_table(outcome: &ScanOutcome) -> String {
    let mut lines = vec![format!(
        "{:<4} {:<8} {:>10} {:>8} {:>8} {:>10} {:>7}",
        "#", "Symbol", "Return", "Sharpe", "MaxDD", "Stability", "Trades"
    )];
    lines.push("-".repeat(61));
    for (i, e) in outcome.entries.iter().enumerate() {
        lines.push(format!(
            "{:<4} {:<8} {:>9.2}% {:>8.2} {:>7.2}% {:>10.3} {:>7}",
            i + 1,
            e.symbol,
            e.stats.total_return * 100.0,
            e.stats.sharpe,
            e.stats.max_drawdown * 100.0,
            e.stats.stability_score,
            e.trade_count
        ));
    }
    for (symbol, error) in &outcome.failures {
        lines.push(format!("FAILED {symbol}: {error}"));
    }
    lines.join("\n")
}
