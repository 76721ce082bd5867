//! Normalizer: raw provider tables → canonical OHLCV.
//!
//! Pipeline per table:
//! 1. reject zero-row tables
//! 2. project a two-level column axis down to a single field axis
//! 3. require all five OHLCV fields
//! 4. keep exactly those five (drops `Adj Close` and friends)
//! 5. coerce every cell to a number or absent
//! 6. reject tables that are absent everywhere
//! 7. key rows by trading date, sorted, first occurrence wins
//!
//! Every rejection is `None`, never an error: callers treat it as
//! "this attempt produced nothing usable".

use tracing::debug;

use super::raw_table::{Cell, ColumnAxis, RawTable};
use crate::domain::{CanonicalOhlcv, OhlcvRow, TickerSymbol};
use crate::schema::{field_coverage, OhlcvField, OHLCV_FIELDS};

/// A raw column after projection onto a single-level field axis.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LabeledColumn<'a> {
    pub label: &'a str,
    pub cells: &'a [Cell],
}

/// Which level of a two-level axis enumerates tickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickerLevel {
    Outer,
    Inner,
}

/// Project a raw table's columns onto a single-level field axis for `ticker`.
///
/// Flat tables pass through. For two-level tables the level containing the
/// ticker is selected and dropped. If the ticker appears on both levels, the
/// level whose remaining labels cover all five OHLCV fields wins; when that
/// does not settle it, the projection fails rather than guessing.
pub(crate) fn project_fields<'a>(
    raw: &'a RawTable,
    ticker: &TickerSymbol,
) -> Option<Vec<LabeledColumn<'a>>> {
    let (outer, inner) = match raw.columns() {
        ColumnAxis::Flat(labels) => {
            return Some(
                labels
                    .iter()
                    .enumerate()
                    .filter_map(|(i, label)| {
                        raw.column(i).map(|cells| LabeledColumn {
                            label: label.as_str(),
                            cells,
                        })
                    })
                    .collect(),
            );
        }
        ColumnAxis::TwoLevel { outer, inner } => (outer, inner),
    };

    let in_outer = outer.iter().any(|l| ticker.matches_label(l));
    let in_inner = inner.iter().any(|l| ticker.matches_label(l));

    let level = match (in_outer, in_inner) {
        (false, false) => {
            debug!(%ticker, "ticker not present on either column level");
            return None;
        }
        (true, false) => TickerLevel::Outer,
        (false, true) => TickerLevel::Inner,
        (true, true) => {
            let by_outer = select_level(raw, outer, inner, TickerLevel::Outer, ticker);
            let by_inner = select_level(raw, outer, inner, TickerLevel::Inner, ticker);
            let outer_ok = field_coverage(by_outer.iter().map(|c| c.label)).is_complete();
            let inner_ok = field_coverage(by_inner.iter().map(|c| c.label)).is_complete();
            return match (outer_ok, inner_ok) {
                (true, false) => Some(by_outer),
                (false, true) => Some(by_inner),
                _ => {
                    debug!(%ticker, "ticker on both column levels, projection is ambiguous");
                    None
                }
            };
        }
    };

    Some(select_level(raw, outer, inner, level, ticker))
}

fn select_level<'a>(
    raw: &'a RawTable,
    outer: &'a [String],
    inner: &'a [String],
    level: TickerLevel,
    ticker: &TickerSymbol,
) -> Vec<LabeledColumn<'a>> {
    outer
        .iter()
        .zip(inner)
        .enumerate()
        .filter_map(|(i, (o, n))| {
            let (symbol_label, field_label) = match level {
                TickerLevel::Outer => (o, n),
                TickerLevel::Inner => (n, o),
            };
            if !ticker.matches_label(symbol_label) {
                return None;
            }
            raw.column(i).map(|cells| LabeledColumn {
                label: field_label.as_str(),
                cells,
            })
        })
        .collect()
}

/// First column carrying `field`, if any.
pub(crate) fn find_field<'a>(
    columns: &[LabeledColumn<'a>],
    field: OhlcvField,
) -> Option<&'a [Cell]> {
    columns
        .iter()
        .find(|c| OhlcvField::from_label(c.label) == Some(field))
        .map(|c| c.cells)
}

/// Normalizer for raw price history.
pub struct Normalizer;

impl Normalizer {
    /// Normalize a raw table for `ticker`, or `None` if it holds nothing usable.
    pub fn normalize(raw: &RawTable, ticker: &TickerSymbol) -> Option<CanonicalOhlcv> {
        if raw.is_empty() {
            debug!(%ticker, "raw table has no rows");
            return None;
        }

        let columns = project_fields(raw, ticker)?;

        let coverage = field_coverage(columns.iter().map(|c| c.label));
        if !coverage.is_complete() {
            debug!(%ticker, missing = ?coverage.missing, "raw table is missing required fields");
            return None;
        }

        // Coverage is complete, so every field resolves to a column.
        let mut coerced: Vec<Vec<Option<f64>>> = Vec::with_capacity(OHLCV_FIELDS.len());
        for field in OHLCV_FIELDS {
            let cells = find_field(&columns, field)?;
            coerced.push(cells.iter().map(Cell::to_number).collect());
        }

        if coerced.iter().all(|col| col.iter().all(Option::is_none)) {
            debug!(%ticker, "every cell is absent after coercion");
            return None;
        }

        let rows = raw
            .index()
            .iter()
            .enumerate()
            .map(|(i, ts)| OhlcvRow {
                date: ts.date(),
                open: coerced[0][i],
                high: coerced[1][i],
                low: coerced[2][i],
                close: coerced[3][i],
                volume: coerced[4][i],
            })
            .collect();

        CanonicalOhlcv::from_rows(ticker.clone(), rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(13, 30, 0)
            .unwrap()
    }

    fn aapl() -> TickerSymbol {
        TickerSymbol::new("AAPL").unwrap()
    }

    fn numbers(values: &[f64]) -> Vec<Cell> {
        values.iter().copied().map(Cell::Number).collect()
    }

    fn flat_table(labels: &[&str]) -> RawTable {
        let index = vec![ts(4), ts(5)];
        let columns = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.to_string(), numbers(&[i as f64 + 1.0, i as f64 + 2.0])))
            .collect();
        RawTable::flat(index, columns).unwrap()
    }

    /// Two-level table with `(field, ticker)` keys, or `(ticker, field)` when `ticker_outer`.
    fn two_level_table(ticker_outer: bool, tickers: &[&str]) -> RawTable {
        let fields = ["Open", "High", "Low", "Close", "Adj Close", "Volume"];
        let mut columns = Vec::new();
        for (t_idx, t) in tickers.iter().enumerate() {
            for (f_idx, f) in fields.iter().enumerate() {
                let base = (t_idx * 100 + f_idx) as f64;
                let key = if ticker_outer {
                    (t.to_string(), f.to_string())
                } else {
                    (f.to_string(), t.to_string())
                };
                columns.push((key, numbers(&[base, base + 0.5])));
            }
        }
        RawTable::two_level(vec![ts(4), ts(5)], columns).unwrap()
    }

    #[test]
    fn empty_table_is_absent() {
        assert!(Normalizer::normalize(&RawTable::empty(), &aapl()).is_none());
    }

    #[test]
    fn flat_table_keeps_exactly_five_fields() {
        let raw = flat_table(&[
            "Open",
            "High",
            "Low",
            "Close",
            "Adj Close",
            "Volume",
            "Dividends",
        ]);
        let table = Normalizer::normalize(&raw, &aapl()).unwrap();
        assert_eq!(table.len(), 2);
        let first = &table.rows()[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(first.open, Some(1.0));
        assert_eq!(first.close, Some(4.0));
        assert_eq!(first.volume, Some(6.0));
        assert_eq!(table.to_dataframe().unwrap().width(), 6);
    }

    #[test]
    fn lowercase_labels_accepted() {
        let raw = flat_table(&["open", "high", "low", "close", "volume"]);
        assert!(Normalizer::normalize(&raw, &aapl()).is_some());
    }

    #[test]
    fn missing_field_is_absent() {
        let raw = flat_table(&["Open", "High", "Low", "Adj Close", "Volume"]);
        assert!(Normalizer::normalize(&raw, &aapl()).is_none());
    }

    #[test]
    fn field_by_ticker_layout_projects_inner_level() {
        let raw = two_level_table(false, &["AAPL", "MSFT"]);
        let table = Normalizer::normalize(&raw, &aapl()).unwrap();
        assert_eq!(table.rows()[0].open, Some(0.0));
        assert_eq!(table.rows()[0].close, Some(3.0));
        assert_eq!(table.rows()[1].volume, Some(5.5));
    }

    #[test]
    fn ticker_by_field_layout_projects_outer_level() {
        let raw = two_level_table(true, &["MSFT", "AAPL"]);
        let table = Normalizer::normalize(&raw, &aapl()).unwrap();
        assert_eq!(table.rows()[0].open, Some(100.0));
        assert_eq!(table.rows()[0].close, Some(103.0));
    }

    #[test]
    fn ticker_match_ignores_case() {
        let raw = two_level_table(false, &["aapl"]);
        assert!(Normalizer::normalize(&raw, &aapl()).is_some());
    }

    #[test]
    fn unknown_ticker_in_two_level_table_is_absent() {
        let raw = two_level_table(false, &["MSFT"]);
        assert!(Normalizer::normalize(&raw, &aapl()).is_none());
    }

    #[test]
    fn ticker_on_both_levels_resolved_by_field_coverage() {
        // A degenerate symbol named "CLOSE": outer level carries fields, inner carries tickers.
        let close = TickerSymbol::new("CLOSE").unwrap();
        let raw = two_level_table(false, &["CLOSE"]);
        let table = Normalizer::normalize(&raw, &close).unwrap();
        assert_eq!(table.rows()[0].high, Some(1.0));
    }

    #[test]
    fn ticker_on_both_levels_without_clear_winner_is_absent() {
        let t = TickerSymbol::new("X").unwrap();
        let raw = RawTable::two_level(
            vec![ts(4)],
            vec![
                (("X".into(), "X".into()), numbers(&[1.0])),
                (("Open".into(), "X".into()), numbers(&[2.0])),
            ],
        )
        .unwrap();
        assert!(Normalizer::normalize(&raw, &t).is_none());
    }

    #[test]
    fn unparseable_cells_become_absent() {
        let raw = RawTable::flat(
            vec![ts(4), ts(5)],
            vec![
                ("Open".into(), vec![Cell::Text("101.5".into()), Cell::Text("n/a".into())]),
                ("High".into(), numbers(&[102.0, 103.0])),
                ("Low".into(), numbers(&[100.0, 101.0])),
                ("Close".into(), vec![Cell::Number(101.0), Cell::Missing]),
                ("Volume".into(), vec![Cell::Text("1200".into()), Cell::Number(f64::NAN)]),
            ],
        )
        .unwrap();
        let table = Normalizer::normalize(&raw, &aapl()).unwrap();
        assert_eq!(table.rows()[0].open, Some(101.5));
        assert_eq!(table.rows()[0].volume, Some(1200.0));
        assert_eq!(table.rows()[1].open, None);
        assert_eq!(table.rows()[1].close, None);
        assert_eq!(table.rows()[1].volume, None);
        assert_eq!(table.rows()[1].high, Some(103.0));
    }

    #[test]
    fn pure_noise_is_absent() {
        let noise = || vec![Cell::Text("--".into()), Cell::Missing];
        let raw = RawTable::flat(
            vec![ts(4), ts(5)],
            ["Open", "High", "Low", "Close", "Volume"]
                .iter()
                .map(|l| (l.to_string(), noise()))
                .collect(),
        )
        .unwrap();
        assert!(Normalizer::normalize(&raw, &aapl()).is_none());
    }

    #[test]
    fn rows_sorted_by_date_with_first_duplicate_kept() {
        let raw = RawTable::flat(
            vec![ts(6), ts(4), ts(6)],
            ["Open", "High", "Low", "Close", "Volume"]
                .iter()
                .map(|l| (l.to_string(), numbers(&[3.0, 1.0, 9.0])))
                .collect(),
        )
        .unwrap();
        let table = Normalizer::normalize(&raw, &aapl()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].close, Some(1.0));
        assert_eq!(table.rows()[1].close, Some(3.0));
    }

    #[test]
    fn duplicate_field_labels_use_first_column() {
        let raw = flat_table(&["Open", "High", "Low", "Close", "close", "Volume"]);
        let table = Normalizer::normalize(&raw, &aapl()).unwrap();
        assert_eq!(table.rows()[0].close, Some(4.0));
    }
}
