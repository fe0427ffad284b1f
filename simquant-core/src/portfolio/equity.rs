//! Equity curve — append-only mark-to-market history.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One mark-to-market row.
///
/// Accounting identity: `total == cash + values.values().sum()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityRow {
    pub date: NaiveDate,
    /// Market value per symbol (position × latest close).
    pub values: BTreeMap<String, f64>,
    pub cash: f64,
    /// Commission paid since the start of the run.
    pub commission: f64,
    pub total: f64,
}

/// Ordered equity rows. The first row is the opening row: start date, all cash.
///
/// Only the portfolio appends; once a run ends the curve is moved out and
/// read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityCurve {
    rows: Vec<EquityRow>,
}

impl EquityCurve {
    pub(crate) fn push(&mut self, row: EquityRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[EquityRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&EquityRow> {
        self.rows.first()
    }

    pub fn last(&self) -> Option<&EquityRow> {
        self.rows.last()
    }

    /// Total equity per row.
    pub fn totals(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.total).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    /// Calendar days between the first and last row.
    pub fn calendar_days(&self) -> i64 {
        match (self.rows.first(), self.rows.last()) {
            (Some(a), Some(b)) => (b.date - a.date).num_days(),
            _ => 0,
        }
    }

    /// Stored market value of `symbol` in the latest row.
    pub(crate) fn last_value(&self, symbol: &str) -> Option<f64> {
        self.rows.last().and_then(|r| r.values.get(symbol).copied())
    }
}
