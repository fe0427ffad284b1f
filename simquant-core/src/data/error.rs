use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for data loading and feed queries.
///
/// `InsufficientHistory` is the only recoverable variant: a strategy that
/// receives it skips the symbol for the current date-step. Everything else
/// is raised while constructing a feed and stops the run before it starts.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no data file for symbol '{symbol}' (expected {})", path.display())]
    DataNotFound { symbol: String, path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed data for '{symbol}' at row {row}: {message}")]
    Parse {
        symbol: String,
        row: u64,
        message: String,
    },

    #[error("symbol '{0}' listed more than once")]
    DuplicateSymbol(String),

    #[error("invalid date range: start {start} is not before end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("no bars for any symbol inside the requested date range")]
    EmptyRange,

    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),

    #[error("insufficient history for '{symbol}': requested {requested}, available {available}")]
    InsufficientHistory {
        symbol: String,
        requested: usize,
        available: usize,
    },

    #[error("failed to write bars: {0}")]
    Write(String),
}

impl FeedError {
    /// True for conditions a strategy is expected to absorb.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FeedError::InsufficientHistory { .. })
    }
}
