//! CSV export of price and dividend history.
//!
//! Absent values become empty fields; nothing is written as zero.

use crate::data::provider::DataError;
use crate::domain::{CanonicalOhlcv, Dividend};

fn field(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, DataError> {
    let data = wtr
        .into_inner()
        .map_err(|e| DataError::ExportError(format!("failed to flush CSV writer: {e}")))?;
    String::from_utf8(data)
        .map_err(|e| DataError::ExportError(format!("CSV output is not valid UTF-8: {e}")))
}

fn csv_error(e: csv::Error) -> DataError {
    DataError::ExportError(e.to_string())
}

/// Columns: date, open, high, low, close, volume
pub fn export_history_csv(table: &CanonicalOhlcv) -> Result<String, DataError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "open", "high", "low", "close", "volume"])
        .map_err(csv_error)?;

    for row in table.rows() {
        wtr.write_record([
            row.date.to_string(),
            field(row.open),
            field(row.high),
            field(row.low),
            field(row.close),
            field(row.volume),
        ])
        .map_err(csv_error)?;
    }

    finish(wtr)
}

/// Columns: date, amount
pub fn export_dividends_csv(dividends: &[Dividend]) -> Result<String, DataError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "amount"]).map_err(csv_error)?;
    for d in dividends {
        wtr.write_record([d.date.to_string(), d.amount.to_string()])
            .map_err(csv_error)?;
    }
    finish(wtr)
}
