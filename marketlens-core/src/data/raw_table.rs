//! Raw tabular responses, exactly as a provider hands them over.
//!
//! A raw table is a date-time row index plus a column axis that is either
//! flat (`Open`, `Close`, ...) or two-level (`(Close, AAPL)` or
//! `(AAPL, Close)`, with no promise about which level is which). Cells are
//! loosely typed: providers occasionally send numbers as strings, or
//! garbage where a number should be.

use chrono::NaiveDateTime;

use super::provider::DataError;

/// A single raw cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Coerce to a finite number. Anything else is absent, never zero.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v).filter(|v| v.is_finite()),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Cell::Missing => None,
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<Option<f64>> for Cell {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Cell::Missing, Cell::Number)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

/// Column labels of a raw table.
///
/// For `TwoLevel`, column `i` is labelled `(outer[i], inner[i])`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnAxis {
    Flat(Vec<String>),
    TwoLevel { outer: Vec<String>, inner: Vec<String> },
}

impl ColumnAxis {
    pub fn len(&self) -> usize {
        match self {
            ColumnAxis::Flat(labels) => labels.len(),
            ColumnAxis::TwoLevel { outer, .. } => outer.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Opaque tabular response from a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    index: Vec<NaiveDateTime>,
    columns: ColumnAxis,
    /// Column-major: `data[col][row]`.
    data: Vec<Vec<Cell>>,
}

impl RawTable {
    /// The zero-row, zero-column table.
    pub fn empty() -> Self {
        Self {
            index: Vec::new(),
            columns: ColumnAxis::Flat(Vec::new()),
            data: Vec::new(),
        }
    }

    /// Build a table with a single-level column axis.
    pub fn flat(
        index: Vec<NaiveDateTime>,
        columns: Vec<(String, Vec<Cell>)>,
    ) -> Result<Self, DataError> {
        let (labels, data): (Vec<String>, Vec<Vec<Cell>>) = columns.into_iter().unzip();
        Self::build(index, ColumnAxis::Flat(labels), data)
    }

    /// Build a table with a two-level column axis; each key is `(outer, inner)`.
    pub fn two_level(
        index: Vec<NaiveDateTime>,
        columns: Vec<((String, String), Vec<Cell>)>,
    ) -> Result<Self, DataError> {
        let mut outer = Vec::with_capacity(columns.len());
        let mut inner = Vec::with_capacity(columns.len());
        let mut data = Vec::with_capacity(columns.len());
        for ((o, i), cells) in columns {
            outer.push(o);
            inner.push(i);
            data.push(cells);
        }
        Self::build(index, ColumnAxis::TwoLevel { outer, inner }, data)
    }

    fn build(
        index: Vec<NaiveDateTime>,
        columns: ColumnAxis,
        data: Vec<Vec<Cell>>,
    ) -> Result<Self, DataError> {
        let rows = index.len();
        if let Some((i, col)) = data.iter().enumerate().find(|(_, c)| c.len() != rows) {
            return Err(DataError::ValidationError(format!(
                "column {i} has {} cells but the index has {rows} rows",
                col.len()
            )));
        }
        Ok(Self {
            index,
            columns,
            data,
        })
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.index.len()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.data.len()
    }

    /// True if the table has zero rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn columns(&self) -> &ColumnAxis {
        &self.columns
    }

    pub fn column(&self, i: usize) -> Option<&[Cell]> {
        self.data.get(i).map(|c| c.as_slice())
    }
}
