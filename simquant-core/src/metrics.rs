//! Performance metrics — pure functions over the equity curve.
//!
//! Every metric takes the total-equity series (and, for Calmar, the calendar
//! span) and returns a scalar. Standard deviations are population
//! deviations; annualization assumes 252 trading days.

use serde::{Deserialize, Serialize};

use crate::portfolio::EquityCurve;

const TRADING_DAYS: f64 = 252.0;
const DAYS_PER_YEAR: f64 = 365.25;

/// Summary statistics computed once at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    /// Positive fraction, 0.15 = 15% below the running peak.
    pub max_drawdown: f64,
    /// Longest run of consecutive rows spent below a prior peak.
    pub drawdown_duration: usize,
    pub stability_score: f64,
    pub final_equity: f64,
}

impl PerformanceStats {
    pub fn compute(curve: &EquityCurve) -> Self {
        let totals = curve.totals();
        Self::from_totals(&totals, curve.calendar_days())
    }

    /// Same as [`compute`](Self::compute) from a raw total series spanning
    /// `calendar_days`.
    pub fn from_totals(totals: &[f64], calendar_days: i64) -> Self {
        let tr = total_return(totals);
        let dd = max_drawdown(totals);
        let sharpe = sharpe_ratio(totals);
        Self {
            total_return: tr,
            annualized_return: annualized_return(tr, calendar_days),
            sharpe,
            sortino: sortino_ratio(totals),
            calmar: calmar_ratio(tr, dd.depth, calendar_days),
            max_drawdown: dd.depth,
            drawdown_duration: dd.longest_duration,
            stability_score: stability_score(sharpe, dd.depth),
            final_equity: totals.last().copied().unwrap_or(0.0),
        }
    }

    /// Ordered `(label, formatted value)` rows.
    pub fn table(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total Return", format!("{:.2}%", self.total_return * 100.0)),
            (
                "Annualized Return",
                format!("{:.2}%", self.annualized_return * 100.0),
            ),
            ("Sharpe Ratio", format!("{:.2}", self.sharpe)),
            ("Sortino Ratio", format!("{:.2}", self.sortino)),
            ("Calmar Ratio", format!("{:.2}", self.calmar)),
            ("Max Drawdown", format!("{:.2}%", self.max_drawdown * 100.0)),
            ("Drawdown Duration", format!("{}", self.drawdown_duration)),
            ("Stability Score", format!("{:.2}", self.stability_score)),
        ]
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Simple period returns `r_t = total_t / total_{t-1} - 1`.
///
/// A non-positive previous total yields 0 for that step.
pub fn period_returns(totals: &[f64]) -> Vec<f64> {
    totals
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// `Π(1 + r_t) - 1`. Zero with fewer than two rows.
pub fn total_return(totals: &[f64]) -> f64 {
    if totals.len() < 2 {
        return 0.0;
    }
    period_returns(totals).iter().map(|r| 1.0 + r).product::<f64>() - 1.0
}

/// `(1 + TR)^(365.25 / days) - 1`, or TR itself over a non-positive span.
pub fn annualized_return(total_return: f64, calendar_days: i64) -> f64 {
    if calendar_days <= 0 {
        return total_return;
    }
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(DAYS_PER_YEAR / calendar_days as f64) - 1.0
}

/// `√252 · mean(r) / stdev(r)`. Zero when stdev is zero.
pub fn sharpe_ratio(totals: &[f64]) -> f64 {
    let returns = period_returns(totals);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * TRADING_DAYS.sqrt()
}

/// `√252 · mean(r) / stdev(r where r < 0)`. Zero without negative returns.
pub fn sortino_ratio(totals: &[f64]) -> f64 {
    let returns = period_returns(totals);
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if downside.is_empty() {
        return 0.0;
    }
    let std = std_dev(&downside);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * TRADING_DAYS.sqrt()
}

/// Deepest decline from the running peak.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Drawdown {
    /// `(peak - trough) / peak`, in `[0, 1]` for non-negative equity.
    pub depth: f64,
    /// Row index of the peak preceding the deepest trough.
    pub peak_index: usize,
    /// Row index of the deepest trough (first occurrence on ties).
    pub trough_index: usize,
    /// Longest run of consecutive rows with drawdown > 0.
    pub longest_duration: usize,
}

pub fn max_drawdown(totals: &[f64]) -> Drawdown {
    let mut result = Drawdown::default();
    let Some(&first) = totals.first() else {
        return result;
    };
    let mut peak = first;
    let mut peak_index = 0;
    let mut run = 0;

    for (i, &total) in totals.iter().enumerate() {
        if total > peak {
            peak = total;
            peak_index = i;
        }
        let dd = if peak > 0.0 {
            ((peak - total) / peak).max(0.0)
        } else {
            0.0
        };
        if dd > result.depth {
            result.depth = dd;
            result.peak_index = peak_index;
            result.trough_index = i;
        }
        run = if dd > 0.0 { run + 1 } else { 0 };
        result.longest_duration = result.longest_duration.max(run);
    }
    result
}

/// `annualized / MDD`; -1 on a losing run, 0 without drawdown.
pub fn calmar_ratio(total_return: f64, max_drawdown: f64, calendar_days: i64) -> f64 {
    if max_drawdown <= 0.0 {
        return 0.0;
    }
    if total_return < 0.0 {
        return -1.0;
    }
    annualized_return(total_return, calendar_days) / max_drawdown
}

/// Ranking heuristic: Sharpe discounted by drawdown depth.
pub fn stability_score(sharpe: f64, max_drawdown: f64) -> f64 {
    sharpe * (1.0 - max_drawdown.min(1.0))
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn total_return_compounds() {
        assert!(approx(total_return(&[100.0, 110.0, 99.0]), -0.01));
        assert_eq!(total_return(&[100.0]), 0.0);
        assert_eq!(total_return(&[]), 0.0);
    }

    #[test]
    fn population_std() {
        // Population stdev of [1, 3] is 1.
        assert!(approx(std_dev(&[1.0, 3.0]), 1.0));
        assert_eq!(std_dev(&[5.0]), 0.0);
    }

    #[test]
    fn sharpe_zero_for_flat_or_constant_return() {
        assert_eq!(sharpe_ratio(&[100.0, 100.0, 100.0]), 0.0);
        assert_eq!(sharpe_ratio(&[100.0, 110.0, 121.0]), 0.0);
    }

    #[test]
    fn sharpe_known_returns() {
        // Returns: +10%, -10%  -> mean 0 -> Sharpe 0.
        assert!(approx(sharpe_ratio(&[100.0, 110.0, 99.0]), 0.0));
        // Returns: +2%, +1%  -> mean 1.5%, pop std 0.5%.
        let s = sharpe_ratio(&[100.0, 102.0, 103.02]);
        assert!(approx(s, 3.0 * 252f64.sqrt()), "{s}");
    }

    #[test]
    fn sortino_uses_downside_only() {
        assert_eq!(sortino_ratio(&[100.0, 101.0, 102.0]), 0.0);
        // Returns +10%, -5%, -10%: downside std = 0.025.
        let totals = [100.0, 110.0, 104.5, 94.05];
        let mean = (0.10 - 0.05 - 0.10) / 3.0;
        let expected = mean / 0.025 * 252f64.sqrt();
        assert!(approx(sortino_ratio(&totals), expected));
    }

    #[test]
    fn drawdown_depth_and_duration() {
        let dd = max_drawdown(&[100.0, 120.0, 90.0, 110.0, 130.0, 117.0]);
        assert!(approx(dd.depth, 0.25));
        assert_eq!(dd.peak_index, 1);
        assert_eq!(dd.trough_index, 2);
        assert_eq!(dd.longest_duration, 2);
    }

    #[test]
    fn drawdown_first_occurrence_wins_ties() {
        let dd = max_drawdown(&[100.0, 50.0, 100.0, 50.0]);
        assert!(approx(dd.depth, 0.5));
        assert_eq!(dd.trough_index, 1);
    }

    #[test]
    fn drawdown_monotonic_is_zero() {
        let dd = max_drawdown(&[1.0, 2.0, 3.0]);
        assert_eq!(dd.depth, 0.0);
        assert_eq!(dd.longest_duration, 0);
        assert_eq!(max_drawdown(&[]).depth, 0.0);
    }

    #[test]
    fn calmar_edge_cases() {
        assert_eq!(calmar_ratio(0.1, 0.0, 365), 0.0);
        assert_eq!(calmar_ratio(-0.1, 0.2, 365), -1.0);
        // Exactly one year: annualized equals total return.
        assert!(approx(calmar_ratio(0.1, 0.05, 365), {
            let ann = 1.1f64.powf(365.25 / 365.0) - 1.0;
            ann / 0.05
        }));
    }

    #[test]
    fn annualized_over_zero_days_is_total_return() {
        assert_eq!(annualized_return(0.07, 0), 0.07);
    }

    #[test]
    fn stability_discounts_by_drawdown() {
        assert!(approx(stability_score(2.0, 0.25), 1.5));
        assert_eq!(stability_score(2.0, 3.0), 0.0);
    }

    #[test]
    fn table_labels_in_order() {
        let stats = PerformanceStats::from_totals(&[100.0, 110.0, 99.0], 2);
        let labels: Vec<_> = stats.table().into_iter().map(|(l, _)| l).collect();
        assert_eq!(
            labels,
            vec![
                "Total Return",
                "Annualized Return",
                "Sharpe Ratio",
                "Sortino Ratio",
                "Calmar Ratio",
                "Max Drawdown",
                "Drawdown Duration",
                "Stability Score",
            ]
        );
        assert_eq!(stats.table()[0].1, "-1.00%");
        assert_eq!(stats.table()[5].1, "10.00%");
    }
}
