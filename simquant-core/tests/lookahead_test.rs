//! Look-ahead contamination tests for every bundled strategy.
//!
//! Invariant: nothing dispatched for date t may depend on a bar dated after t.
//!
//! Two checks:
//! 1. A spy wrapper asserts the feed never exposes a bar newer than the
//!    market event being handled.
//! 2. Runs over a truncated series (first 100 dates) and the full series
//!    (200 dates) must agree on every equity row and trade up to the cut.

use chrono::NaiveDate;
use simquant_core::data::{generate_random_walk, BarFeed, DateRange, RandomWalkParams};
use simquant_core::domain::{Bar, MarketEvent};
use simquant_core::portfolio::{Portfolio, SizingPolicy};
use simquant_core::strategy::{
    MaCrossParams, ObvTrendParams, RsiParams, Strategy, StrategyError, StrategySpec,
};
use simquant_core::{BacktestEngine, BacktestOutput, EventQueue, SimulatedExecutionHandler};

const SYMBOLS: [&str; 2] = ["AAA", "BBB"];
const CUT: usize = 100;

fn make_series(n: usize) -> Vec<(String, Vec<Bar>)> {
    SYMBOLS
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let params = RandomWalkParams {
                start_date: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
                days: n,
                seed: 7 + i as u64,
                volatility: 0.03,
                ..RandomWalkParams::default()
            };
            (s.to_string(), generate_random_walk(s, &params))
        })
        .collect()
}

fn all_specs() -> Vec<StrategySpec> {
    vec![
        StrategySpec::MaCross(MaCrossParams {
            short_window: 5,
            long_window: 20,
        }),
        StrategySpec::Rsi(RsiParams::default()),
        StrategySpec::ObvTrend(ObvTrendParams::default()),
        StrategySpec::BuyAndHold,
    ]
}

fn sizing_for(spec: &StrategySpec) -> SizingPolicy {
    if spec.emits_target_weights() {
        SizingPolicy::WeightRebalance {
            max_position_fraction: 0.25,
        }
    } else {
        SizingPolicy::FixedNotional {
            amount: 10_000.0,
            lot_size: 1,
        }
    }
}

/// Delegates to `inner` after checking the feed shows nothing from the future.
struct Spy {
    inner: Box<dyn Strategy>,
}

impl Strategy for Spy {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn on_market_event(
        &mut self,
        event: &MarketEvent,
        feed: &BarFeed,
        queue: &mut EventQueue,
    ) -> Result<(), StrategyError> {
        assert_eq!(feed.current_date(), Some(event.timestamp));
        for symbol in SYMBOLS {
            for bar in feed.latest_bars(symbol, usize::MAX) {
                assert!(
                    bar.date <= event.timestamp,
                    "{}: bar {} visible while handling {}",
                    self.inner.name(),
                    bar.date,
                    event.timestamp
                );
            }
        }
        self.inner.on_market_event(event, feed, queue)
    }
}

fn run(spec: &StrategySpec, series: Vec<(String, Vec<Bar>)>) -> BacktestOutput {
    let feed = BarFeed::from_series(series, DateRange::all()).unwrap();
    let start = feed.start_date().unwrap();
    let portfolio =
        Portfolio::new(feed.symbol_list(), 100_000.0, start, sizing_for(spec)).unwrap();
    let strategy = Spy {
        inner: spec.build().unwrap(),
    };
    BacktestEngine::new(
        feed,
        Box::new(strategy),
        portfolio,
        Box::new(SimulatedExecutionHandler::default()),
    )
    .run(None)
    .unwrap()
}

#[test]
fn feed_never_exposes_future_bars() {
    for spec in all_specs() {
        let out = run(&spec, make_series(150));
        assert_eq!(out.loop_stats.dates, 150, "{}", spec.name());
    }
}

#[test]
fn truncated_and_full_runs_agree_up_to_cut() {
    let full_series = make_series(2 * CUT);
    let truncated_series: Vec<(String, Vec<Bar>)> = full_series
        .iter()
        .map(|(s, bars)| (s.clone(), bars[..CUT].to_vec()))
        .collect();
    let cut_date = full_series[0].1[CUT - 1].date;

    for spec in all_specs() {
        let full = run(&spec, full_series.clone());
        let truncated = run(&spec, truncated_series.clone());

        // Opening row plus one row per date.
        let rows = CUT + 1;
        assert_eq!(truncated.equity_curve.len(), rows);
        assert_eq!(
            &full.equity_curve.rows()[..rows],
            truncated.equity_curve.rows(),
            "{}: equity diverges before the cut",
            spec.name()
        );

        let full_trades: Vec<_> = full
            .trades
            .iter()
            .filter(|t| t.date <= cut_date)
            .cloned()
            .collect();
        assert_eq!(
            full_trades,
            truncated.trades,
            "{}: trades diverge before the cut",
            spec.name()
        );
    }
}
