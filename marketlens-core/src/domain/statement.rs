//! Financial statements: line items × reporting periods.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ticker::TickerSymbol;
use crate::data::provider::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    Income,
    Balance,
    CashFlow,
}

impl StatementKind {
    pub fn title(self) -> &'static str {
        match self {
            StatementKind::Income => "Income Statement",
            StatementKind::Balance => "Balance Sheet",
            StatementKind::CashFlow => "Cash Flow",
        }
    }
}

impl FromStr for StatementKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(StatementKind::Income),
            "balance" => Ok(StatementKind::Balance),
            "cashflow" | "cash-flow" | "cash_flow" => Ok(StatementKind::CashFlow),
            other => Err(DataError::ValidationError(format!(
                "unknown statement kind '{other}' (expected income, balance or cashflow)"
            ))),
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Periodicity {
    Quarterly,
    Annual,
}

impl Periodicity {
    /// Prefix used by the provider's time-series keys.
    pub fn prefix(self) -> &'static str {
        match self {
            Periodicity::Quarterly => "quarterly",
            Periodicity::Annual => "annual",
        }
    }
}

/// One financial statement for one ticker.
///
/// `periods` are ordered most recent first; each line item holds one value
/// per period, absent where the provider reported nothing usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatement {
    pub symbol: TickerSymbol,
    pub kind: StatementKind,
    pub periodicity: Periodicity,
    pub periods: Vec<NaiveDate>,
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl FinancialStatement {
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty() || self.line_items.is_empty()
    }

    pub fn line_item(&self, name: &str) -> Option<&LineItem> {
        self.line_items.iter().find(|l| l.name == name)
    }

    /// One row per line item, one column per period (named by its date).
    pub fn to_dataframe(&self) -> Result<DataFrame, DataError> {
        let mut columns = Vec::with_capacity(self.periods.len() + 1);
        let names: Vec<&str> = self.line_items.iter().map(|l| l.name.as_str()).collect();
        columns.push(Column::new("Line Item".into(), names));
        for (i, period) in self.periods.iter().enumerate() {
            let values: Vec<Option<f64>> = self
                .line_items
                .iter()
                .map(|l| l.values.get(i).copied().flatten())
                .collect();
            columns.push(Column::new(period.to_string().into(), values));
        }
        DataFrame::new(columns)
            .map_err(|e| DataError::Other(format!("dataframe creation: {e}")))
    }
}
