//! SimQuant Runner — backtest orchestration, reports, export, universe scans.
//!
//! This crate builds on `simquant-core` to provide:
//! - TOML run configuration with validation and content-hash run ids
//! - Single-backtest runner wiring feed, strategy, portfolio and execution
//! - The text performance report and the `run_text_report` entry point
//! - JSON/CSV artifact export
//! - Parallel per-symbol universe scans

pub mod config;
pub mod export;
pub mod report;
pub mod runner;
pub mod scan;

pub use config::{BacktestConfig, BacktestSection, ConfigError, RunId};
pub use export::{
    export_equity_csv, export_json, export_stats_csv, export_trades_csv, import_json,
    load_artifacts, save_artifacts,
};
pub use report::{render_text, run_text_report, BacktestReport, SCHEMA_VERSION};
pub use runner::{run_backtest, run_from_series, RunError};
pub use scan::{render_table, scan_universe, ScanEntry, ScanError, ScanOutcome};
