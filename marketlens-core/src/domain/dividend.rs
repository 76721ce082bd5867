use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single dividend payment (ex-date and cash amount per share).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    pub date: NaiveDate,
    pub amount: f64,
}
