//! Property tests for the Normalizer.
//!
//! Uses proptest to verify:
//! 1. Projection keeps exactly the five canonical fields
//! 2. A table missing any required field is absent
//! 3. Output rows are unique and strictly increasing by date
//! 4. Coercion never invents values: absent in, absent out
//! 5. Canonical tables survive a round trip through the raw model

use chrono::{Days, NaiveDate};
use proptest::prelude::*;

use marketlens_core::data::{Cell, Normalizer, RawTable};
use marketlens_core::domain::TickerSymbol;
use marketlens_core::schema::{OhlcvField, OHLCV_FIELDS};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        4 => (1.0..1000.0_f64).prop_map(Cell::Number),
        1 => Just(Cell::Missing),
        1 => Just(Cell::Number(f64::NAN)),
        1 => "[a-z-]{0,4}".prop_map(Cell::Text),
        1 => (1.0..1000.0_f64).prop_map(|v| Cell::Text(format!("{v}"))),
    ]
}

/// Day offsets from a base date; duplicates and disorder allowed.
fn arb_offsets() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..60, 1..30)
}

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

fn index(offsets: &[u64]) -> Vec<chrono::NaiveDateTime> {
    offsets
        .iter()
        .map(|&o| {
            base()
                .checked_add_days(Days::new(o))
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap()
        })
        .collect()
}

fn labels() -> Vec<&'static str> {
    vec!["Open", "High", "Low", "Close", "Adj Close", "Volume"]
}

fn ticker() -> TickerSymbol {
    TickerSymbol::new("AAPL").unwrap()
}

proptest! {
    /// Two-level tables project to exactly the five canonical fields for the
    /// requested ticker, with the other tickers' data ignored.
    #[test]
    fn two_level_projection_keeps_five_fields(
        offsets in arb_offsets(),
        ticker_outer in any::<bool>(),
        seed in 1.0..500.0_f64,
    ) {
        let n = offsets.len();
        let mut columns = Vec::new();
        for (t_idx, symbol) in ["MSFT", "AAPL", "GOOG"].iter().enumerate() {
            for label in labels() {
                let value = seed + t_idx as f64 * 1000.0;
                let key = if ticker_outer {
                    (symbol.to_string(), label.to_string())
                } else {
                    (label.to_string(), symbol.to_string())
                };
                columns.push((key, vec![Cell::Number(value); n]));
            }
        }
        let raw = RawTable::two_level(index(&offsets), columns).unwrap();
        let table = Normalizer::normalize(&raw, &ticker()).unwrap();

        let df = table.to_dataframe().unwrap();
        prop_assert_eq!(df.width(), 6);
        for row in table.rows() {
            for field in OHLCV_FIELDS {
                prop_assert_eq!(row.get(field), Some(seed + 1000.0));
            }
        }
    }

    /// Dropping any one required field makes the whole table absent.
    #[test]
    fn missing_field_is_absent(offsets in arb_offsets(), drop in 0usize..5) {
        let n = offsets.len();
        let dropped = OHLCV_FIELDS[drop];
        let columns = OHLCV_FIELDS
            .iter()
            .filter(|&&f| f != dropped)
            .map(|f| (f.label().to_string(), vec![Cell::Number(1.0); n]))
            .collect();
        let raw = RawTable::flat(index(&offsets), columns).unwrap();
        prop_assert!(Normalizer::normalize(&raw, &ticker()).is_none());
    }

    /// Rows come out unique and sorted, and every output value was present
    /// and finite in the first input row for that date.
    #[test]
    fn rows_sorted_unique_and_faithful(
        offsets in arb_offsets(),
        cells in prop::collection::vec(prop::collection::vec(arb_cell(), 30), 5),
    ) {
        let n = offsets.len();
        let columns: Vec<(String, Vec<Cell>)> = OHLCV_FIELDS
            .iter()
            .zip(&cells)
            .map(|(f, col)| (f.label().to_string(), col[..n].to_vec()))
            .collect();
        let raw = RawTable::flat(index(&offsets), columns.clone()).unwrap();

        let Some(table) = Normalizer::normalize(&raw, &ticker()) else {
            return Ok(());
        };

        prop_assert!(table.rows().windows(2).all(|w| w[0].date < w[1].date));

        for row in table.rows() {
            let offset = (row.date - base()).num_days() as u64;
            let first = offsets.iter().position(|&o| o == offset).unwrap();
            for (field, (_, col)) in OHLCV_FIELDS.iter().zip(&columns) {
                prop_assert_eq!(row.get(*field), col[first].to_number());
            }
        }
    }

    /// A table of pure noise normalizes to absent.
    #[test]
    fn noise_only_is_absent(offsets in arb_offsets(), text in "[a-z]{1,5}") {
        let n = offsets.len();
        let columns = OHLCV_FIELDS
            .iter()
            .map(|f| (f.label().to_string(), vec![Cell::Text(text.clone()); n]))
            .collect();
        let raw = RawTable::flat(index(&offsets), columns).unwrap();
        prop_assert!(Normalizer::normalize(&raw, &ticker()).is_none());
    }

    /// Normalizing a canonical table's raw form gives the same table back.
    #[test]
    fn canonical_round_trip(offsets in arb_offsets(), close in 1.0..1000.0_f64) {
        let n = offsets.len();
        let columns = OHLCV_FIELDS
            .iter()
            .map(|f| {
                let v = if *f == OhlcvField::Volume { 1e6 } else { close };
                (f.label().to_string(), vec![Cell::Number(v); n])
            })
            .collect();
        let raw = RawTable::flat(index(&offsets), columns).unwrap();
        let table = Normalizer::normalize(&raw, &ticker()).unwrap();
        let again = Normalizer::normalize(&table.to_raw_table(), &ticker()).unwrap();
        prop_assert_eq!(table, again);
    }
}

#[test]
fn empty_table_is_absent() {
    assert!(Normalizer::normalize(&RawTable::empty(), &ticker()).is_none());
}
