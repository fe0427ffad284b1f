//! End-to-end engine scenarios.
//!
//! Each test wires a real feed, portfolio and simulated execution handler
//! around a scripted strategy and checks the run output.

use chrono::{Duration, NaiveDate};
use simquant_core::data::{BarFeed, DateRange};
use simquant_core::domain::{Bar, Direction, MarketEvent, SignalEvent, SignalType};
use simquant_core::execution::{SimulatedExecutionHandler, ZeroCommission};
use simquant_core::portfolio::{Portfolio, SizingPolicy};
use simquant_core::strategy::{BuyAndHold, Strategy, StrategyError};
use simquant_core::{BacktestEngine, BacktestOutput, EventQueue};

// ── Helpers ──────────────────────────────────────────────────────────

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn make_bar(symbol: &str, date: NaiveDate, close: f64) -> Bar {
    Bar {
        symbol: symbol.into(),
        date,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000,
        adj_close: close,
    }
}

fn rising_bars(symbol: &str, n: usize, start: f64, daily: f64) -> Vec<Bar> {
    let base = d(2024, 1, 1);
    let mut price = start;
    (0..n)
        .map(|i| {
            let bar = make_bar(symbol, base + Duration::days(i as i64), price);
            price *= 1.0 + daily;
            bar
        })
        .collect()
}

/// Emits `(signal_type, strength)` for `symbol` on chosen 1-based date-steps.
struct Scripted {
    symbol: String,
    plan: Vec<(usize, SignalType, f64)>,
    step: usize,
}

impl Scripted {
    fn new(symbol: &str, plan: Vec<(usize, SignalType, f64)>) -> Self {
        Self {
            symbol: symbol.into(),
            plan,
            step: 0,
        }
    }
}

impl Strategy for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn on_market_event(
        &mut self,
        event: &MarketEvent,
        _feed: &BarFeed,
        queue: &mut EventQueue,
    ) -> Result<(), StrategyError> {
        self.step += 1;
        for &(at, kind, strength) in &self.plan {
            if at == self.step {
                queue.push(SignalEvent::new(
                    self.symbol.clone(),
                    event.timestamp,
                    kind,
                    strength,
                ));
            }
        }
        Ok(())
    }
}

fn run(
    series: Vec<(String, Vec<Bar>)>,
    strategy: Box<dyn Strategy>,
    capital: f64,
    sizing: SizingPolicy,
) -> BacktestOutput {
    let feed = BarFeed::from_series(series, DateRange::all()).unwrap();
    let symbols = feed.symbol_list();
    let start = feed.start_date().unwrap();
    let portfolio = Portfolio::new(symbols, capital, start, sizing).unwrap();
    BacktestEngine::new(
        feed,
        strategy,
        portfolio,
        Box::new(SimulatedExecutionHandler::default()),
    )
    .run(None)
    .unwrap()
}

fn fixed(amount: f64) -> SizingPolicy {
    SizingPolicy::FixedNotional {
        amount,
        lot_size: 1,
    }
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn scenario_a_long_then_exit_on_rising_series() {
    let bars = rising_bars("AAA", 30, 100.0, 0.01);
    let strategy = Scripted::new(
        "AAA",
        vec![(5, SignalType::Long, 1.0), (25, SignalType::Exit, 1.0)],
    );
    let out = run(
        vec![("AAA".into(), bars)],
        Box::new(strategy),
        100_000.0,
        fixed(1000.0),
    );

    assert!(out.stats.total_return > 0.0, "{:?}", out.stats);
    assert_eq!(out.loop_stats.order_events, 2);
    assert_eq!(out.loop_stats.fill_events, 2);
    assert_eq!(out.trades.len(), 2);
    assert_eq!(out.trades[0].direction, Direction::Buy);
    assert_eq!(out.trades[1].direction, Direction::Sell);
    assert_eq!(out.trades[0].quantity, out.trades[1].quantity);
    assert_eq!(out.final_positions["AAA"], 0);
    // Opening row plus one row per bar.
    assert_eq!(out.equity_curve.len(), 31);
}

#[test]
fn scenario_b_buy_clipped_to_cash() {
    let bars = vec![make_bar("AAA", d(2024, 1, 2), 300.0)];
    let strategy = Scripted::new("AAA", vec![(1, SignalType::Long, 1.0)]);
    let out = run(
        vec![("AAA".into(), bars)],
        Box::new(strategy),
        1_000.0,
        fixed(5_000.0),
    );

    // floor(1000 / 300) = 3 shares.
    assert_eq!(out.trades.len(), 1);
    assert_eq!(out.trades[0].quantity, 3);
    assert_eq!(out.diagnostics.cash_clipped_orders, 1);
    assert_eq!(out.final_cash, 1_000.0 - 900.0 - 1.0);
}

#[test]
fn scenario_b_unaffordable_buy_leaves_cash_untouched() {
    let bars = vec![make_bar("AAA", d(2024, 1, 2), 300.0)];
    let strategy = Scripted::new("AAA", vec![(1, SignalType::Long, 1.0)]);
    let out = run(
        vec![("AAA".into(), bars)],
        Box::new(strategy),
        250.0,
        fixed(5_000.0),
    );

    assert!(out.trades.is_empty());
    assert_eq!(out.loop_stats.order_events, 0);
    assert_eq!(out.diagnostics.dropped_unaffordable, 1);
    assert_eq!(out.final_cash, 250.0);
}

#[test]
fn scenario_c_gap_day_carries_last_value() {
    // 2024-01-01 is a Monday. BBB has no Tuesday bar.
    let mon = d(2024, 1, 1);
    let tue = d(2024, 1, 2);
    let wed = d(2024, 1, 3);
    let a = vec![
        make_bar("AAA", mon, 10.0),
        make_bar("AAA", tue, 11.0),
        make_bar("AAA", wed, 12.0),
    ];
    let b = vec![make_bar("BBB", mon, 20.0), make_bar("BBB", wed, 25.0)];

    let out = run(
        vec![("AAA".into(), a), ("BBB".into(), b)],
        Box::new(BuyAndHold::new()),
        100_000.0,
        fixed(1_000.0),
    );

    let rows = out.equity_curve.rows();
    assert_eq!(rows.len(), 4);
    let (monday, tuesday, wednesday) = (&rows[1], &rows[2], &rows[3]);
    assert_eq!(tuesday.date, tue);
    // 50 shares of BBB bought Monday at 20.
    assert_eq!(monday.values["BBB"], 1_000.0);
    assert_eq!(tuesday.values["BBB"], monday.values["BBB"]);
    assert_eq!(tuesday.values["AAA"], 100.0 * 11.0);
    assert_eq!(wednesday.values["BBB"], 50.0 * 25.0);
    for row in rows {
        let sum: f64 = row.values.values().sum();
        assert!((row.total - (row.cash + sum)).abs() < 1e-9);
    }
}

#[test]
fn scenario_d_target_weight_is_clamped() {
    let bars = vec![
        make_bar("AAA", d(2024, 1, 2), 50.0),
        make_bar("AAA", d(2024, 1, 3), 50.0),
    ];
    let strategy = Scripted::new("AAA", vec![(1, SignalType::Adjust, 1.5)]);
    let out = run(
        vec![("AAA".into(), bars)],
        Box::new(strategy),
        100_000.0,
        SizingPolicy::WeightRebalance {
            max_position_fraction: 0.2,
        },
    );

    // 20% of 100_000 at 50 = 400 shares, not 150%.
    assert_eq!(out.trades.len(), 1);
    assert_eq!(out.trades[0].quantity, 400);
    assert_eq!(out.diagnostics.cash_clipped_orders, 0);
    let last = out.equity_curve.last().unwrap();
    let weight = last.values["AAA"] / last.total;
    assert!((weight - 0.2).abs() < 1e-3, "weight {weight}");
}

#[test]
fn repeated_exit_is_idempotent() {
    let bars = rising_bars("AAA", 6, 10.0, 0.0);
    let strategy = Scripted::new(
        "AAA",
        vec![
            (1, SignalType::Long, 1.0),
            (2, SignalType::Exit, 1.0),
            (3, SignalType::Exit, 1.0),
            (4, SignalType::Exit, 1.0),
        ],
    );
    let out = run(
        vec![("AAA".into(), bars)],
        Box::new(strategy),
        10_000.0,
        fixed(1_000.0),
    );

    assert_eq!(out.loop_stats.signal_events, 4);
    assert_eq!(out.loop_stats.order_events, 2);
    assert_eq!(out.diagnostics.exit_noops, 2);
    assert_eq!(out.final_positions["AAA"], 0);
}

#[test]
fn exit_on_unpriced_day_is_dropped_not_fatal() {
    let bars = vec![
        make_bar("AAA", d(2024, 1, 1), 10.0),
        make_bar("AAA", d(2024, 1, 2), 10.0),
        make_bar("AAA", d(2024, 1, 3), 0.0),
        make_bar("AAA", d(2024, 1, 4), 10.0),
    ];
    let strategy = Scripted::new(
        "AAA",
        vec![(1, SignalType::Long, 1.0), (3, SignalType::Exit, 1.0)],
    );
    let out = run(
        vec![("AAA".into(), bars)],
        Box::new(strategy),
        10_000.0,
        fixed(1_000.0),
    );

    assert_eq!(out.trades.len(), 1);
    assert_eq!(out.loop_stats.order_events, 1);
    assert_eq!(out.diagnostics.invalid_price_signals, 1);
    assert_eq!(out.final_positions["AAA"], 100);

    // The zero-close day keeps the prior mark for the held position.
    let rows = out.equity_curve.rows();
    assert_eq!(rows[3].date, d(2024, 1, 3));
    assert_eq!(rows[3].values["AAA"], rows[2].values["AAA"]);
    assert_eq!(rows[3].values["AAA"], 1_000.0);
}

#[test]
fn fill_price_override_flows_to_cash() {
    let bars = rising_bars("AAA", 2, 10.0, 0.0);
    let feed = BarFeed::from_series(vec![("AAA".into(), bars)], DateRange::all()).unwrap();
    let portfolio = Portfolio::new(vec!["AAA".into()], 1_000.0, d(2024, 1, 1), fixed(100.0))
        .unwrap();
    let execution = SimulatedExecutionHandler::new(Box::new(ZeroCommission))
        .with_price_override("AAA", 12.5);
    let out = BacktestEngine::new(
        feed,
        Box::new(Scripted::new("AAA", vec![(1, SignalType::Long, 1.0)])),
        portfolio,
        Box::new(execution),
    )
    .run(None)
    .unwrap();

    // Sized at the close (10 shares), settled at the override.
    assert_eq!(out.trades[0].quantity, 10);
    assert_eq!(out.trades[0].price, 12.5);
    assert_eq!(out.final_cash, 1_000.0 - 125.0);
}
