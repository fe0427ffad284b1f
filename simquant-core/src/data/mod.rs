//! Bar data: CSV ingest, the lockstep feed, synthetic series

pub mod csv_source;
pub mod error;
pub mod feed;
pub mod synthetic;

pub use csv_source::{csv_path, load_symbol, load_symbols, read_bars, write_bars};
pub use error::FeedError;
pub use feed::{BarFeed, DateRange};
pub use synthetic::{generate_random_walk, write_random_walk, RandomWalkParams};
