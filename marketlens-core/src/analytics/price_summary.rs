//! Headline statistics for a price history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::CanonicalOhlcv;

/// Computed over rows with all four prices present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub trading_days: usize,
    pub last_close: f64,
    /// Last close minus first close.
    pub change: f64,
    pub change_pct: f64,
    pub last_volume: Option<f64>,
    pub mean_close: f64,
}

impl PriceSummary {
    /// `None` when no row has a complete set of prices.
    pub fn from_table(table: &CanonicalOhlcv) -> Option<Self> {
        let rows = table.complete_rows();
        let first = rows.first()?;
        let last = rows.last()?;
        let first_close = first.close?;
        let last_close = last.close?;

        let change = last_close - first_close;
        let change_pct = if first_close != 0.0 {
            change / first_close * 100.0
        } else {
            0.0
        };
        let mean_close =
            rows.iter().filter_map(|r| r.close).sum::<f64>() / rows.len() as f64;

        Some(Self {
            first_date: first.date,
            last_date: last.date,
            trading_days: rows.len(),
            last_close,
            change,
            change_pct,
            last_volume: last.volume,
            mean_close,
        })
    }
}
