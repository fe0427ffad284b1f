//! Run report — the persisted result of one backtest and its text rendering.

use std::fmt::Write as _;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use simquant_core::engine::BacktestOutput;

use crate::config::{BacktestConfig, RunId};
use crate::runner::run_backtest;

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

const RULE_WIDTH: usize = 40;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config: BacktestConfig,
    pub output: BacktestOutput,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestReport {
    pub fn new(run_id: RunId, config: BacktestConfig, output: BacktestOutput) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id,
            config,
            output,
        }
    }

    pub fn final_equity(&self) -> f64 {
        self.output.stats.final_equity
    }

    /// First 12 hex characters of the run id.
    pub fn short_id(&self) -> &str {
        self.run_id.get(..12).unwrap_or(&self.run_id)
    }
}

/// Render the "FINAL PERFORMANCE REPORT" block.
pub fn render_text(report: &BacktestReport) -> String {
    let out = &report.output;
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut text = String::with_capacity(1024);

    // Writing into a String cannot fail.
    let _ = writeln!(text, "{heavy}");
    let _ = writeln!(text, "{:^width$}", "FINAL PERFORMANCE REPORT", width = RULE_WIDTH);
    let _ = writeln!(text, "{heavy}");
    let _ = writeln!(text, "{:<20}: {}", "Strategy", out.strategy);
    let _ = writeln!(text, "{:<20}: {}", "Symbols", out.symbols.join(", "));
    if let (Some(first), Some(last)) = (out.equity_curve.first(), out.equity_curve.last()) {
        let _ = writeln!(text, "{:<20}: {} to {}", "Period", first.date, last.date);
    }
    let _ = writeln!(text, "{:<20}: {}", "Sizing", report.config.sizing.name());
    let _ = writeln!(text, "{light}");
    for (label, value) in out.stats.table() {
        let _ = writeln!(text, "{label:<20}: {value}");
    }
    let _ = writeln!(text, "{light}");
    let _ = writeln!(text, "{:<20}: {}", "Trades", out.trades.len());
    let _ = writeln!(text, "{:<20}: {:.2}", "Total Commission", out.total_commission);
    let _ = writeln!(text, "Final Portfolio Value : {:.2}", out.stats.final_equity);

    if out.diagnostics.total() > 0 {
        let _ = writeln!(text, "{light}");
        for (label, count) in out.diagnostics.rows() {
            if count > 0 {
                let _ = writeln!(text, "{label:<30}: {count}");
            }
        }
    }
    let _ = writeln!(text, "{heavy}");
    text
}

/// Run the backtest `config` describes and return its text report.
///
/// The one call a tool layer needs: symbols, date range and parameters in,
/// report text out.
pub fn run_text_report(config: &BacktestConfig) -> anyhow::Result<String> {
    let report = run_backtest(config, None).with_context(|| {
        format!(
            "backtest over {} failed",
            config.backtest.symbols.join(", ")
        )
    })?;
    Ok(render_text(&report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::run_from_series;
    use chrono::{Duration, NaiveDate};
    use simquant_core::domain::Bar;
    use simquant_core::strategy::StrategySpec;

    fn make_report() -> BacktestReport {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars: Vec<Bar> = [10.0, 12.0, 9.0, 11.0]
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                symbol: "AAA".into(),
                date: base + Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1,
                adj_close: c,
            })
            .collect();
        let mut config = BacktestConfig::for_symbols(vec!["AAA".into()], "unused");
        config.strategy = StrategySpec::BuyAndHold;
        run_from_series(&config, vec![("AAA".into(), bars)], None).unwrap()
    }

    #[test]
    fn text_report_has_every_stat_row() {
        let report = make_report();
        let text = render_text(&report);
        assert!(text.contains("FINAL PERFORMANCE REPORT"));
        for label in [
            "Total Return",
            "Annualized Return",
            "Sharpe Ratio",
            "Sortino Ratio",
            "Calmar Ratio",
            "Max Drawdown",
            "Drawdown Duration",
            "Stability Score",
        ] {
            assert!(text.contains(label), "missing {label}");
        }
        assert!(text.contains("Strategy            : buy_and_hold"));
        assert!(text.contains(&format!(
            "Final Portfolio Value : {:.2}",
            report.final_equity()
        )));
    }

    #[test]
    fn short_id_is_prefix() {
        let report = make_report();
        assert_eq!(report.short_id().len(), 12);
        assert!(report.run_id.starts_with(report.short_id()));
    }

    #[test]
    fn text_report_fails_cleanly_without_data() {
        let config = BacktestConfig::for_symbols(vec!["NOPE".into()], "/nonexistent/dir");
        let err = run_text_report(&config).unwrap_err();
        assert!(format!("{err:#}").contains("NOPE"));
    }
}
