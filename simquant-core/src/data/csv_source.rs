//! CSV bar source — one file per symbol, `<dir>/<SYMBOL>.csv`.
//!
//! Expected columns: `Date, Open, High, Low, Close, Volume, AdjClose`.
//! Header spellings written by common download scripts are accepted
//! (`Adj Close`, lower-case names, an unnamed pandas index column).
//! A missing or empty `AdjClose` is backfilled from `Close`.

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use super::error::FeedError;
use crate::domain::Bar;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(
        rename = "Date",
        alias = "date",
        alias = "Datetime",
        alias = "datetime",
        alias = ""
    )]
    date: String,
    #[serde(rename = "Open", alias = "open")]
    open: f64,
    #[serde(rename = "High", alias = "high")]
    high: f64,
    #[serde(rename = "Low", alias = "low")]
    low: f64,
    #[serde(rename = "Close", alias = "close")]
    close: f64,
    #[serde(rename = "Volume", alias = "volume")]
    volume: f64,
    #[serde(
        rename = "AdjClose",
        alias = "Adj Close",
        alias = "adj_close",
        alias = "adjclose",
        default
    )]
    adj_close: Option<f64>,
}

/// Path of the data file for `symbol` inside `dir`.
pub fn csv_path(dir: &Path, symbol: &str) -> PathBuf {
    dir.join(format!("{symbol}.csv"))
}

/// Load and sort the bars for one symbol.
///
/// Fails with `DataNotFound` if the file does not exist.
pub fn load_symbol(dir: &Path, symbol: &str) -> Result<Vec<Bar>, FeedError> {
    let path = csv_path(dir, symbol);
    if !path.is_file() {
        return Err(FeedError::DataNotFound {
            symbol: symbol.to_string(),
            path,
        });
    }
    let file = std::fs::File::open(&path).map_err(|source| FeedError::Io {
        path: path.clone(),
        source,
    })?;
    let bars = read_bars(symbol, file)?;
    debug!(symbol, bars = bars.len(), path = %path.display(), "loaded bars");
    Ok(bars)
}

/// Load every symbol in order. The first missing file aborts the load.
pub fn load_symbols<S: AsRef<str>>(
    dir: &Path,
    symbols: &[S],
) -> Result<Vec<(String, Vec<Bar>)>, FeedError> {
    symbols
        .iter()
        .map(|s| {
            let symbol = s.as_ref();
            load_symbol(dir, symbol).map(|bars| (symbol.to_string(), bars))
        })
        .collect()
}

/// Parse bars from any CSV reader, then sort ascending by date.
///
/// When a date appears more than once the last row wins.
pub fn read_bars<R: io::Read>(symbol: &str, reader: R) -> Result<Vec<Bar>, FeedError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();
    for (i, record) in rdr.deserialize::<CsvRow>().enumerate() {
        // Header is row 1.
        let row = i as u64 + 2;
        let record = record.map_err(|e| FeedError::Parse {
            symbol: symbol.to_string(),
            row,
            message: e.to_string(),
        })?;
        let date = parse_date(&record.date).ok_or_else(|| FeedError::Parse {
            symbol: symbol.to_string(),
            row,
            message: format!("unparseable date '{}'", record.date),
        })?;
        let volume = if record.volume.is_finite() && record.volume > 0.0 {
            record.volume.round() as u64
        } else {
            0
        };
        bars.push(Bar {
            symbol: symbol.to_string(),
            date,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume,
            adj_close: record.adj_close.unwrap_or(record.close),
        });
    }

    let bars = sort_and_dedup(symbol, bars);
    flag_suspect_bars(symbol, &bars);
    Ok(bars)
}

/// Warn about rows with NaN or inconsistent OHLC prices. They stay in the
/// series; signals and marks on those dates see no usable price.
pub(crate) fn flag_suspect_bars(symbol: &str, bars: &[Bar]) -> usize {
    let mut suspect = bars.iter().filter(|b| !b.is_sane());
    let Some(first) = suspect.next() else {
        return 0;
    };
    let count = 1 + suspect.count();
    let voids = bars.iter().filter(|b| b.is_void()).count();
    warn!(
        symbol,
        count,
        voids,
        first = %first.date,
        "bars with invalid prices"
    );
    count
}

/// Write bars in the canonical column layout.
pub fn write_bars<W: io::Write>(bars: &[Bar], writer: W) -> Result<(), FeedError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Date", "Open", "High", "Low", "Close", "Volume", "AdjClose"])
        .map_err(|e| FeedError::Write(e.to_string()))?;
    for bar in bars {
        wtr.write_record([
            bar.date.to_string(),
            format!("{:.6}", bar.open),
            format!("{:.6}", bar.high),
            format!("{:.6}", bar.low),
            format!("{:.6}", bar.close),
            bar.volume.to_string(),
            format!("{:.6}", bar.adj_close),
        ])
        .map_err(|e| FeedError::Write(e.to_string()))?;
    }
    wtr.flush().map_err(|e| FeedError::Write(e.to_string()))
}

/// Stable sort by date, keeping the last row for duplicated dates.
pub(crate) fn sort_and_dedup(symbol: &str, mut bars: Vec<Bar>) -> Vec<Bar> {
    bars.sort_by_key(|b| b.date);
    let before = bars.len();
    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(prev) if prev.date == bar.date => *prev = bar,
            _ => out.push(bar),
        }
    }
    if out.len() != before {
        warn!(
            symbol,
            dropped = before - out.len(),
            "duplicate dates in bar series, kept last occurrence"
        );
    }
    out
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y/%m/%d"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()
}
