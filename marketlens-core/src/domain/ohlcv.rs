//! Canonical OHLCV table: the only price-history shape downstream code sees.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::ticker::TickerSymbol;
use crate::data::provider::DataError;
use crate::data::raw_table::{Cell, RawTable};
use crate::schema::OhlcvField;

/// One trading day. Every field is numeric or explicitly absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRow {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl OhlcvRow {
    pub fn get(&self, field: OhlcvField) -> Option<f64> {
        match field {
            OhlcvField::Open => self.open,
            OhlcvField::High => self.high,
            OhlcvField::Low => self.low,
            OhlcvField::Close => self.close,
            OhlcvField::Volume => self.volume,
        }
    }

    /// True if no field carries a value.
    pub fn is_void(&self) -> bool {
        self.open.is_none()
            && self.high.is_none()
            && self.low.is_none()
            && self.close.is_none()
            && self.volume.is_none()
    }

    /// True if open, high, low and close are all present (volume may be absent).
    pub fn has_prices(&self) -> bool {
        self.open.is_some() && self.high.is_some() && self.low.is_some() && self.close.is_some()
    }
}

/// Normalized price history for one ticker.
///
/// Invariants: at least one row; dates strictly increasing; at least one
/// value present somewhere in the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalOhlcv {
    symbol: TickerSymbol,
    rows: Vec<OhlcvRow>,
}

impl CanonicalOhlcv {
    /// Build a table from rows in any order.
    ///
    /// Rows are stably sorted by date and duplicate dates keep their first
    /// occurrence. Returns `None` if nothing usable is left.
    pub fn from_rows(symbol: TickerSymbol, mut rows: Vec<OhlcvRow>) -> Option<Self> {
        rows.sort_by_key(|r| r.date);
        rows.dedup_by_key(|r| r.date);
        if rows.is_empty() || rows.iter().all(OhlcvRow::is_void) {
            return None;
        }
        Some(Self { symbol, rows })
    }

    pub fn symbol(&self) -> &TickerSymbol {
        &self.symbol
    }

    pub fn rows(&self) -> &[OhlcvRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false for a constructed table; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    /// One field as a column.
    pub fn series(&self, field: OhlcvField) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.get(field)).collect()
    }

    /// Rows with all four prices present. Charts and statistics use these.
    pub fn complete_rows(&self) -> Vec<&OhlcvRow> {
        self.rows.iter().filter(|r| r.has_prices()).collect()
    }

    /// The last `n` rows, oldest first.
    pub fn tail(&self, n: usize) -> &[OhlcvRow] {
        &self.rows[self.rows.len().saturating_sub(n)..]
    }

    /// The last `n` complete rows as a DataFrame, newest first.
    pub fn recent_complete_dataframe(&self, n: usize) -> Result<DataFrame, DataError> {
        let recent: Vec<OhlcvRow> = self
            .rows
            .iter()
            .rev()
            .filter(|r| r.has_prices())
            .take(n)
            .cloned()
            .collect();
        rows_to_dataframe(&recent)
    }

    /// Convert to a Polars DataFrame with a `Date` column followed by the
    /// five canonical fields.
    pub fn to_dataframe(&self) -> Result<DataFrame, DataError> {
        rows_to_dataframe(&self.rows)
    }

    /// Convert back into a flat raw table with midnight timestamps.
    pub fn to_raw_table(&self) -> RawTable {
        let index = self
            .rows
            .iter()
            .map(|r| r.date.and_time(chrono::NaiveTime::MIN))
            .collect();
        let columns = crate::schema::OHLCV_FIELDS
            .iter()
            .map(|&field| {
                let cells = self.rows.iter().map(|r| Cell::from(r.get(field))).collect();
                (field.label().to_string(), cells)
            })
            .collect();
        // Every column is built from the same rows, so lengths always agree.
        RawTable::flat(index, columns).unwrap_or_else(|_| RawTable::empty())
    }
}

/// Convert OHLCV rows to a Polars DataFrame.
pub(crate) fn rows_to_dataframe(rows: &[OhlcvRow]) -> Result<DataFrame, DataError> {
    // NaiveDate::default() is 1970-01-01
    let epoch = NaiveDate::default();
    let dates: Vec<i32> = rows
        .iter()
        .map(|r| (r.date - epoch).num_days() as i32)
        .collect();
    let column =
        |field: OhlcvField| -> Vec<Option<f64>> { rows.iter().map(|r| r.get(field)).collect() };

    DataFrame::new(vec![
        Column::new("Date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::Other(format!("date cast: {e}")))?,
        Column::new("Open".into(), column(OhlcvField::Open)),
        Column::new("High".into(), column(OhlcvField::High)),
        Column::new("Low".into(), column(OhlcvField::Low)),
        Column::new("Close".into(), column(OhlcvField::Close)),
        Column::new("Volume".into(), column(OhlcvField::Volume)),
    ])
    .map_err(|e| DataError::Other(format!("dataframe creation: {e}")))
}
