//! Criterion benchmarks for SimQuant hot paths.
//!
//! Benchmarks:
//! 1. Full event loop per strategy (feed, strategy, portfolio, execution)
//! 2. Event loop scaling with universe size
//! 3. Metrics over a long equity series

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use simquant_core::data::{generate_random_walk, BarFeed, DateRange, RandomWalkParams};
use simquant_core::domain::Bar;
use simquant_core::metrics::max_drawdown;
use simquant_core::portfolio::{Portfolio, SizingPolicy};
use simquant_core::strategy::{MaCrossParams, ObvTrendParams, RsiParams, StrategySpec};
use simquant_core::{BacktestEngine, BacktestOutput, PerformanceStats, SimulatedExecutionHandler};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_series(days: usize, num_symbols: usize) -> Vec<(String, Vec<Bar>)> {
    (0..num_symbols)
        .map(|i| {
            let symbol = format!("SYM{i}");
            let params = RandomWalkParams {
                days,
                seed: i as u64,
                ..RandomWalkParams::default()
            };
            let bars = generate_random_walk(&symbol, &params);
            (symbol, bars)
        })
        .collect()
}

fn run_once(series: &[(String, Vec<Bar>)], spec: &StrategySpec) -> BacktestOutput {
    let feed = BarFeed::from_series(series.to_vec(), DateRange::all()).unwrap();
    let sizing = if spec.emits_target_weights() {
        SizingPolicy::WeightRebalance {
            max_position_fraction: 0.2,
        }
    } else {
        SizingPolicy::FixedNotional {
            amount: 10_000.0,
            lot_size: 1,
        }
    };
    let start = feed.start_date().unwrap();
    let portfolio = Portfolio::new(feed.symbol_list(), 100_000.0, start, sizing).unwrap();
    BacktestEngine::new(
        feed,
        spec.build().unwrap(),
        portfolio,
        Box::new(SimulatedExecutionHandler::default()),
    )
    .run(None)
    .unwrap()
}

// ── 1. Event Loop per Strategy ───────────────────────────────────────

fn bench_event_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_loop");
    let series = make_series(1260, 1);

    let specs = [
        StrategySpec::MaCross(MaCrossParams::default()),
        StrategySpec::Rsi(RsiParams::default()),
        StrategySpec::ObvTrend(ObvTrendParams::default()),
        StrategySpec::BuyAndHold,
    ];
    for spec in &specs {
        group.bench_with_input(BenchmarkId::new(spec.name(), 1260), spec, |b, spec| {
            b.iter(|| run_once(black_box(&series), spec));
        });
    }

    group.finish();
}

// ── 2. Universe Scaling ──────────────────────────────────────────────

fn bench_universe_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("universe_scaling");
    let spec = StrategySpec::MaCross(MaCrossParams::default());

    for num_symbols in [1, 5, 20] {
        let series = make_series(500, num_symbols);
        group.bench_with_input(
            BenchmarkId::new("ma_cross_500_days", num_symbols),
            &series,
            |b, series| {
                b.iter(|| run_once(black_box(series), &spec));
            },
        );
    }

    group.finish();
}

// ── 3. Metrics ───────────────────────────────────────────────────────

fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");
    let totals: Vec<f64> = make_series(5000, 1)[0]
        .1
        .iter()
        .map(|b| b.close * 1000.0)
        .collect();

    group.bench_function("max_drawdown_5000", |b| {
        b.iter(|| max_drawdown(black_box(&totals)));
    });
    group.bench_function("performance_stats_5000", |b| {
        b.iter(|| PerformanceStats::from_totals(black_box(&totals), 7000));
    });

    group.finish();
}

criterion_group!(benches, bench_event_loop, bench_universe_scaling, bench_metrics);
criterion_main!(benches);
