//! Bar data feed — chronological lockstep over every tracked symbol.
//!
//! Each symbol keeps its own cursor into its own sorted series. `advance`
//! picks the smallest unseen date across all symbols and moves forward only
//! the cursors whose next bar carries that date, so a symbol with a gap simply
//! contributes nothing for that step. All queries read the visible prefix
//! `bars[..cursor]`, which structurally rules out look-ahead.

use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::csv_source::{load_symbols, sort_and_dedup};
use super::error::FeedError;
use crate::domain::{Bar, Field, MarketEvent};
use crate::queue::EventQueue;

/// Half-open date filter `[start, end)`. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// No filtering.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, FeedError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s >= e {
                return Err(FeedError::InvalidRange { start: s, end: e });
            }
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date < e)
    }
}

#[derive(Debug)]
struct Track {
    symbol: String,
    bars: Vec<Bar>,
    cursor: usize,
}

impl Track {
    fn visible(&self) -> &[Bar] {
        &self.bars[..self.cursor]
    }

    fn next_date(&self) -> Option<NaiveDate> {
        self.bars.get(self.cursor).map(|b| b.date)
    }
}

/// Streams bars for a fixed symbol list, one calendar date per `advance`.
#[derive(Debug)]
pub struct BarFeed {
    tracks: Vec<Track>,
    index: HashMap<String, usize>,
    range: DateRange,
    current_date: Option<NaiveDate>,
    dates_emitted: usize,
    insufficient_history: Cell<u64>,
}

impl BarFeed {
    /// Build a feed from in-memory series, in the given symbol order.
    ///
    /// Series are sorted (duplicate dates keep the last bar) and filtered by
    /// `range`. Fails with `EmptyRange` when no bar survives the filter.
    pub fn from_series(
        series: Vec<(String, Vec<Bar>)>,
        range: DateRange,
    ) -> Result<Self, FeedError> {
        let mut tracks = Vec::with_capacity(series.len());
        let mut index = HashMap::with_capacity(series.len());

        for (symbol, bars) in series {
            if index.contains_key(&symbol) {
                return Err(FeedError::DuplicateSymbol(symbol));
            }
            let bars: Vec<Bar> = sort_and_dedup(&symbol, bars)
                .into_iter()
                .filter(|b| range.contains(b.date))
                .collect();
            index.insert(symbol.clone(), tracks.len());
            tracks.push(Track {
                symbol,
                bars,
                cursor: 0,
            });
        }

        if tracks.iter().all(|t| t.bars.is_empty()) {
            return Err(FeedError::EmptyRange);
        }

        Ok(Self {
            tracks,
            index,
            range,
            current_date: None,
            dates_emitted: 0,
            insufficient_history: Cell::new(0),
        })
    }

    /// Load `<dir>/<SYMBOL>.csv` for every symbol, then build the feed.
    pub fn from_csv_dir<S: AsRef<str>>(
        dir: &Path,
        symbols: &[S],
        range: DateRange,
    ) -> Result<Self, FeedError> {
        let series = load_symbols(dir, symbols)?;
        let feed = Self::from_series(series, range)?;
        debug!(
            dir = %dir.display(),
            symbols = feed.tracks.len(),
            bars = feed.total_bars(),
            "bar feed ready"
        );
        Ok(feed)
    }

    // ─── Advancing ───────────────────────────────────────────────────

    /// Reveal the next calendar date and push one `MarketEvent`.
    ///
    /// Returns `false`, pushing nothing, once every series is consumed.
    pub fn advance(&mut self, queue: &mut EventQueue) -> bool {
        let Some(date) = self.tracks.iter().filter_map(Track::next_date).min() else {
            return false;
        };
        for track in &mut self.tracks {
            if track.next_date() == Some(date) {
                track.cursor += 1;
            }
        }
        self.current_date = Some(date);
        self.dates_emitted += 1;
        queue.push(MarketEvent { timestamp: date });
        true
    }

    /// True once no symbol has an unseen bar left.
    pub fn is_exhausted(&self) -> bool {
        self.tracks.iter().all(|t| t.cursor == t.bars.len())
    }

    // ─── Queries ─────────────────────────────────────────────────────

    /// Last `n` visible bars, oldest first. Short history returns fewer.
    /// Unknown symbols return an empty slice.
    pub fn latest_bars(&self, symbol: &str, n: usize) -> &[Bar] {
        match self.track(symbol) {
            Some(t) => {
                let visible = t.visible();
                &visible[visible.len().saturating_sub(n)..]
            }
            None => &[],
        }
    }

    /// Last `n` visible values of `field`, oldest first.
    pub fn latest_values(&self, symbol: &str, field: Field, n: usize) -> Vec<f64> {
        self.latest_bars(symbol, n)
            .iter()
            .map(|b| b.field(field))
            .collect()
    }

    pub fn latest_bar(&self, symbol: &str) -> Option<&Bar> {
        self.track(symbol).and_then(|t| t.visible().last())
    }

    pub fn latest_value(&self, symbol: &str, field: Field) -> Option<f64> {
        self.latest_bar(symbol).map(|b| b.field(field))
    }

    pub fn latest_datetime(&self, symbol: &str) -> Option<NaiveDate> {
        self.latest_bar(symbol).map(|b| b.date)
    }

    /// Close of the latest visible bar if it is a usable price (finite and
    /// positive).
    ///
    /// On days the symbol did not print this is the prior bar's close. An
    /// unusable close on the latest bar gives `None`; older closes are not
    /// consulted.
    pub fn current_price(&self, symbol: &str) -> Option<f64> {
        self.latest_value(symbol, Field::Close)
            .filter(|p| p.is_finite() && *p > 0.0)
    }

    /// Exactly `n` values, or `InsufficientHistory`.
    pub fn window(&self, symbol: &str, field: Field, n: usize) -> Result<Vec<f64>, FeedError> {
        let track = self
            .track(symbol)
            .ok_or_else(|| FeedError::UnknownSymbol(symbol.to_string()))?;
        let available = track.cursor;
        if available < n {
            return Err(self.insufficient(symbol, n, available));
        }
        Ok(track.visible()[available - n..]
            .iter()
            .map(|b| b.field(field))
            .collect())
    }

    /// Value `k` bars before the latest visible bar (`k = 0` is the latest).
    pub fn value_back(&self, symbol: &str, field: Field, k: usize) -> Result<f64, FeedError> {
        let track = self
            .track(symbol)
            .ok_or_else(|| FeedError::UnknownSymbol(symbol.to_string()))?;
        let available = track.cursor;
        if k >= available {
            return Err(self.insufficient(symbol, k + 1, available));
        }
        Ok(track.visible()[available - 1 - k].field(field))
    }

    /// True if `symbol` has a bar dated on the current date-step.
    pub fn printed_today(&self, symbol: &str) -> bool {
        self.current_date.is_some() && self.latest_datetime(symbol) == self.current_date
    }

    // ─── Accessors ───────────────────────────────────────────────────

    pub fn current_date(&self) -> Option<NaiveDate> {
        self.current_date
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.tracks.iter().map(|t| t.symbol.as_str())
    }

    pub fn symbol_list(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.symbol.clone()).collect()
    }

    /// Configured start date, or the earliest bar across all symbols.
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.range.start.or_else(|| self.first_date())
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.tracks
            .iter()
            .filter_map(|t| t.bars.first().map(|b| b.date))
            .min()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.tracks
            .iter()
            .filter_map(|t| t.bars.last().map(|b| b.date))
            .max()
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn dates_emitted(&self) -> usize {
        self.dates_emitted
    }

    pub fn total_bars(&self) -> usize {
        self.tracks.iter().map(|t| t.bars.len()).sum()
    }

    /// Number of strict queries that failed for lack of history.
    pub fn insufficient_history_count(&self) -> u64 {
        self.insufficient_history.get()
    }

    fn track(&self, symbol: &str) -> Option<&Track> {
        self.index.get(symbol).map(|&i| &self.tracks[i])
    }

    fn insufficient(&self, symbol: &str, requested: usize, available: usize) -> FeedError {
        self.insufficient_history
            .set(self.insufficient_history.get() + 1);
        FeedError::InsufficientHistory {
            symbol: symbol.to_string(),
            requested,
            available,
        }
    }
}
