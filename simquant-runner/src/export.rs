//! Export — JSON and CSV artifacts for a finished run.
//!
//! - **JSON**: the full `BacktestReport`, with schema versioning
//! - **CSV**: equity curve, trade audit log and the statistics table
//!
//! Persisted reports carry a `schema_version`; versions newer than this
//! build understands are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use simquant_core::domain::TradeAudit;
use simquant_core::metrics::PerformanceStats;
use simquant_core::portfolio::EquityCurve;

use crate::report::{BacktestReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestReport` to pretty JSON.
pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a `BacktestReport` from JSON, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the equity curve.
///
/// Columns: date, one value column per symbol (in `symbols` order), cash,
/// commission, total.
pub fn export_equity_csv(curve: &EquityCurve, symbols: &[String]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["date".to_string()];
    header.extend(symbols.iter().cloned());
    header.extend(["cash", "commission", "total"].map(String::from));
    wtr.write_record(&header)?;

    for row in curve.rows() {
        let mut record = Vec::with_capacity(header.len());
        record.push(row.date.to_string());
        for symbol in symbols {
            let value = row.values.get(symbol).copied().unwrap_or(0.0);
            record.push(format!("{value:.2}"));
        }
        record.push(format!("{:.2}", row.cash));
        record.push(format!("{:.2}", row.commission));
        record.push(format!("{:.2}", row.total));
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the trade audit log.
///
/// Columns: date, symbol, direction, quantity, price, commission
pub fn export_trades_csv(trades: &[TradeAudit]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "symbol", "direction", "quantity", "price", "commission"])?;
    for t in trades {
        wtr.write_record([
            &t.date.to_string(),
            &t.symbol,
            &t.direction.to_string(),
            &t.quantity.to_string(),
            &format!("{:.6}", t.price),
            &format!("{:.2}", t.commission),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the statistics table as `metric,value` rows.
pub fn export_stats_csv(stats: &PerformanceStats) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["metric", "value"])?;
    for (label, value) in stats.table() {
        wtr.write_record([label.to_string(), value])?;
    }
    wtr.write_record(["Final Equity".to_string(), format!("{:.2}", stats.final_equity)])?;
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one run.
///
/// Creates `<output_dir>/<run id prefix>/` containing:
/// - `report.json` — the full `BacktestReport`
/// - `equity.csv` — one row per equity mark
/// - `trades.csv` — trade audit log
/// - `stats.csv` — statistics table
///
/// Identical configs write to the same directory. Returns its path.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(report.short_id());
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let out = &report.output;
    let files = [
        ("report.json", export_json(report)?),
        ("equity.csv", export_equity_csv(&out.equity_curve, &out.symbols)?),
        ("trades.csv", export_trades_csv(&out.trades)?),
        ("stats.csv", export_stats_csv(&out.stats)?),
    ];
    for (name, content) in &files {
        let path = run_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(run_dir)
}

/// Load a `BacktestReport` from an artifact directory's `report.json`.
pub fn load_artifacts(dir: &Path) -> Result<BacktestReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
