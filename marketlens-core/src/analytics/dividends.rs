//! Dividend history statistics.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::Dividend;

/// Payments compared per side of the year-over-year growth figure.
const GROWTH_WINDOW: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendSummary {
    pub most_recent: f64,
    pub mean: f64,
    pub max: f64,
    pub count: usize,
    /// Percent change of the mean of the last 12 payments against the 12
    /// before them. Only reported with more than 12 payments.
    pub yoy_growth_pct: Option<f64>,
    pub annual_totals: BTreeMap<i32, f64>,
}

impl DividendSummary {
    /// `dividends` must be oldest first. `None` for an empty history.
    pub fn from_dividends(dividends: &[Dividend]) -> Option<Self> {
        let most_recent = dividends.last()?.amount;
        let count = dividends.len();
        let amounts: Vec<f64> = dividends.iter().map(|d| d.amount).collect();
        let mean = amounts.iter().sum::<f64>() / count as f64;
        let max = amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut annual_totals = BTreeMap::new();
        for d in dividends {
            *annual_totals.entry(d.date.year()).or_insert(0.0) += d.amount;
        }

        Some(Self {
            most_recent,
            mean,
            max,
            count,
            yoy_growth_pct: yoy_growth(&amounts),
            annual_totals,
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn yoy_growth(amounts: &[f64]) -> Option<f64> {
    let n = amounts.len();
    if n <= GROWTH_WINDOW {
        return None;
    }
    let recent = mean(&amounts[n - GROWTH_WINDOW..]);
    let previous = if n > 2 * GROWTH_WINDOW {
        mean(&amounts[n - 2 * GROWTH_WINDOW..n - GROWTH_WINDOW])
    } else {
        recent
    };
    if previous > 0.0 {
        Some((recent - previous) / previous * 100.0)
    } else {
        Some(0.0)
    }
}
