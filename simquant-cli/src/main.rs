//! SimQuant CLI — run, scan and generate commands.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config and print the report
//! - `scan` — run the config once per symbol in parallel and rank the results
//! - `generate` — write a seeded synthetic price CSV

mod logging;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;

use simquant_core::data::{write_random_walk, RandomWalkParams};
use simquant_runner::{
    export_json, render_table, render_text, run_backtest, save_artifacts, scan_universe,
    BacktestConfig,
};

use logging::{init_logging, LogFormat};

#[derive(Parser)]
#[command(
    name = "simquant",
    about = "SimQuant CLI — event-driven daily-bar backtester"
)]
struct Cli {
    /// Base log level (trace, debug, info, warn, error). RUST_LOG overrides it.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Save report.json, equity.csv, trades.csv and stats.csv under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the full report as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run the config independently on each symbol and rank by stability.
    Scan {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Symbols to scan. Defaults to the config's symbol list.
        #[arg(long, num_args = 1..)]
        symbols: Vec<String>,

        /// Worker threads. Defaults to one per core.
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Write a synthetic random-walk CSV for one symbol.
    Generate {
        /// Symbol name; the file is written as <SYMBOL>.csv.
        #[arg(long)]
        symbol: String,

        /// Number of business days.
        #[arg(long, default_value_t = 500)]
        days: usize,

        /// First date (YYYY-MM-DD). Defaults to 2020-01-01.
        #[arg(long)]
        start: Option<String>,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Starting close.
        #[arg(long, default_value_t = 100.0)]
        start_price: f64,

        /// Output directory.
        #[arg(long, default_value = "data")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            json,
        } => run_cmd(config, output_dir, json),
        Commands::Scan {
            config,
            symbols,
            threads,
        } => scan_cmd(config, symbols, threads),
        Commands::Generate {
            symbol,
            days,
            start,
            seed,
            start_price,
            out_dir,
        } => generate_cmd(symbol, days, start, seed, start_price, out_dir),
    }
}

fn load_config(path: &Path) -> Result<BacktestConfig> {
    BacktestConfig::from_file(path)
        .with_context(|| format!("failed to load config {}", path.display()))
}

fn run_cmd(config_path: PathBuf, output_dir: Option<PathBuf>, json: bool) -> Result<()> {
    let config = load_config(&config_path)?;
    let report = run_backtest(&config, None)?;

    if json {
        println!("{}", export_json(&report)?);
    } else {
        print!("{}", render_text(&report));
    }

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&report, &dir)?;
        info!(path = %run_dir.display(), "artifacts saved");
        if !json {
            println!("Artifacts saved to: {}", run_dir.display());
        }
    }
    Ok(())
}

fn scan_cmd(config_path: PathBuf, symbols: Vec<String>, threads: Option<usize>) -> Result<()> {
    let config = load_config(&config_path)?;
    if threads == Some(0) {
        bail!("--threads must be at least 1");
    }
    let outcome = scan_universe(&config, &symbols, threads, None)?;
    println!("{}", render_table(&outcome));
    if outcome.entries.is_empty() {
        bail!("every symbol in the scan failed");
    }
    Ok(())
}

fn generate_cmd(
    symbol: String,
    days: usize,
    start: Option<String>,
    seed: u64,
    start_price: f64,
    out_dir: PathBuf,
) -> Result<()> {
    if days == 0 {
        bail!("--days must be at least 1");
    }
    if !(start_price.is_finite() && start_price > 0.0) {
        bail!("--start-price must be positive");
    }
    let mut params = RandomWalkParams {
        days,
        seed,
        start_price,
        ..RandomWalkParams::default()
    };
    if let Some(s) = start.as_deref() {
        params.start_date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --start date '{s}'"))?;
    }

    let path = write_random_walk(&out_dir, &symbol, &params)?;
    println!("Wrote {days} bars for {symbol} to {}", path.display());
    Ok(())
}
