//! Seeded synthetic price series.
//!
//! A business-day geometric random walk with noisy open/high/low around the
//! close. Same seed and parameters give byte-identical output, which keeps
//! fixtures and benches reproducible.

use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::csv_source::{csv_path, write_bars};
use super::error::FeedError;
use crate::domain::Bar;

/// Parameters for [`generate_random_walk`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomWalkParams {
    pub start_date: NaiveDate,
    pub days: usize,
    pub start_price: f64,
    /// Mean daily return.
    pub drift: f64,
    /// Standard deviation of the daily return.
    pub volatility: f64,
    /// Standard deviation of the open/high/low noise around the close.
    pub intraday_noise: f64,
    pub min_volume: u64,
    pub max_volume: u64,
    pub seed: u64,
}

impl Default for RandomWalkParams {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            days: 500,
            start_price: 100.0,
            drift: 0.0005,
            volatility: 0.02,
            intraday_noise: 0.005,
            min_volume: 1_000_000,
            max_volume: 5_000_000,
            seed: 42,
        }
    }
}

/// Generate `params.days` business-day bars for `symbol`.
pub fn generate_random_walk(symbol: &str, params: &RandomWalkParams) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut bars = Vec::with_capacity(params.days);
    let mut close = params.start_price;

    for date in business_days(params.start_date).take(params.days) {
        let ret = params.drift + params.volatility * standard_normal(&mut rng);
        // Keep the walk strictly positive.
        close = (close * (1.0 + ret)).max(0.01);

        let open = close * (1.0 + params.intraday_noise * standard_normal(&mut rng));
        let high = open.max(close)
            * (1.0 + (params.intraday_noise * standard_normal(&mut rng)).abs());
        let low = open.min(close)
            * (1.0 - (params.intraday_noise * standard_normal(&mut rng)).abs());
        let volume = if params.max_volume > params.min_volume {
            rng.gen_range(params.min_volume..params.max_volume)
        } else {
            params.min_volume
        };

        bars.push(Bar {
            symbol: symbol.to_string(),
            date,
            open,
            high,
            low: low.max(0.0),
            close,
            volume,
            adj_close: close,
        });
    }
    bars
}

/// Generate a series and write it to `<dir>/<SYMBOL>.csv`, creating `dir`.
pub fn write_random_walk(
    dir: &Path,
    symbol: &str,
    params: &RandomWalkParams,
) -> Result<PathBuf, FeedError> {
    fs::create_dir_all(dir).map_err(|source| FeedError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = csv_path(dir, symbol);
    let file = fs::File::create(&path).map_err(|source| FeedError::Io {
        path: path.clone(),
        source,
    })?;
    write_bars(&generate_random_walk(symbol, params), file)?;
    Ok(path)
}

/// Monday–Friday dates starting at `start` (rolled forward off a weekend).
pub fn business_days(start: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let mut next = start;
    std::iter::from_fn(move || {
        while matches!(next.weekday(), Weekday::Sat | Weekday::Sun) {
            next += Duration::days(1);
        }
        let current = next;
        next += Duration::days(1);
        Some(current)
    })
}

// Box–Muller; rand 0.8 ships no normal distribution without rand_distr.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::csv_source::load_symbol;

    #[test]
    fn same_seed_same_series() {
        let params = RandomWalkParams {
            days: 50,
            ..Default::default()
        };
        let a = generate_random_walk("AAPL", &params);
        let b = generate_random_walk("AAPL", &params);
        assert_eq!(a, b);

        let other = generate_random_walk(
            "AAPL",
            &RandomWalkParams {
                seed: 7,
                ..params
            },
        );
        assert_ne!(a, other);
    }

    #[test]
    fn bars_are_sane_and_on_weekdays() {
        let bars = generate_random_walk("AAPL", &RandomWalkParams::default());
        assert_eq!(bars.len(), 500);
        for bar in &bars {
            assert!(bar.is_sane(), "{bar:?}");
            assert!(!matches!(bar.date.weekday(), Weekday::Sat | Weekday::Sun));
        }
        assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn business_days_skip_weekend() {
        // 2024-01-06 is a Saturday.
        let start = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        let days: Vec<_> = business_days(start).take(2).collect();
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(days[1], NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
    }

    #[test]
    fn written_file_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let params = RandomWalkParams {
            days: 20,
            ..Default::default()
        };
        write_random_walk(dir.path(), "SYN", &params).unwrap();
        let loaded = load_symbol(dir.path(), "SYN").unwrap();
        assert_eq!(loaded.len(), 20);
        assert_eq!(loaded[0].symbol, "SYN");
    }
}
