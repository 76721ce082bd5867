//! Scripted in-memory provider shared by the integration tests.
//!
//! Every call is recorded; price-history calls pop the next scripted response
//! for their shape and fail with `DataError::Other` once the script runs out.

#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use marketlens_core::data::{AdjustmentMode, Cell, DataError, MarketDataProvider, RawTable};
use marketlens_core::domain::{
    AttributeValue, CompanyAttributes, Dividend, FinancialStatement, LookbackPeriod, Periodicity,
    StatementKind, TickerSymbol,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Range {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
        mode: AdjustmentMode,
    },
    Period {
        symbol: String,
        period: LookbackPeriod,
        mode: AdjustmentMode,
    },
    Attributes(String),
    Dividends(String),
    Statement(String),
}

impl Call {
    pub fn is_range(&self) -> bool {
        matches!(self, Call::Range { .. })
    }

    pub fn is_period(&self) -> bool {
        matches!(self, Call::Period { .. })
    }

    pub fn mode(&self) -> Option<AdjustmentMode> {
        match self {
            Call::Range { mode, .. } | Call::Period { mode, .. } => Some(*mode),
            _ => None,
        }
    }
}

type Scripted = Result<RawTable, DataError>;

#[derive(Default)]
pub struct ScriptedProvider {
    range: Mutex<VecDeque<Scripted>>,
    period: Mutex<VecDeque<Scripted>>,
    current_price: Option<f64>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(self, response: Scripted) -> Self {
        self.range.lock().unwrap().push_back(response);
        self
    }

    pub fn with_period(self, response: Scripted) -> Self {
        self.period.lock().unwrap().push_back(response);
        self
    }

    pub fn with_current_price(mut self, price: f64) -> Self {
        self.current_price = Some(price);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn next(queue: &Mutex<VecDeque<Scripted>>) -> Scripted {
        queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(DataError::Other("no scripted response".into())))
    }
}

impl MarketDataProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch_range(
        &self,
        symbol: &TickerSymbol,
        start: NaiveDate,
        end: NaiveDate,
        mode: AdjustmentMode,
    ) -> Result<RawTable, DataError> {
        self.record(Call::Range {
            symbol: symbol.to_string(),
            start,
            end,
            mode,
        });
        Self::next(&self.range)
    }

    fn fetch_period(
        &self,
        symbol: &TickerSymbol,
        period: LookbackPeriod,
        mode: AdjustmentMode,
    ) -> Result<RawTable, DataError> {
        self.record(Call::Period {
            symbol: symbol.to_string(),
            period,
            mode,
        });
        Self::next(&self.period)
    }

    fn fetch_attributes(&self, symbol: &TickerSymbol) -> Result<CompanyAttributes, DataError> {
        self.record(Call::Attributes(symbol.to_string()));
        let mut attributes = CompanyAttributes::new();
        if let Some(price) = self.current_price {
            attributes.insert("currentPrice", AttributeValue::Number(price));
        }
        Ok(attributes)
    }

    fn fetch_dividends(&self, symbol: &TickerSymbol) -> Result<Vec<Dividend>, DataError> {
        self.record(Call::Dividends(symbol.to_string()));
        Ok(Vec::new())
    }

    fn fetch_financial_statement(
        &self,
        symbol: &TickerSymbol,
        kind: StatementKind,
        periodicity: Periodicity,
    ) -> Result<FinancialStatement, DataError> {
        self.record(Call::Statement(symbol.to_string()));
        Ok(FinancialStatement {
            symbol: symbol.clone(),
            kind,
            periodicity,
            periods: Vec::new(),
            line_items: Vec::new(),
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

pub fn ticker(s: &str) -> TickerSymbol {
    TickerSymbol::new(s).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `n` weekdays starting at `start` (inclusive when it is a weekday).
pub fn weekdays(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    start
        .iter_days()
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .take(n)
        .collect()
}

/// A `(field, symbol)` two-level table shaped like a Yahoo response in raw
/// mode: OHLC around each close, an `Adj Close` column and a volume.
pub fn yahoo_like_table(symbol: &str, dates: &[NaiveDate], closes: &[f64]) -> RawTable {
    let index = dates
        .iter()
        .map(|d| d.and_hms_opt(9, 30, 0).unwrap())
        .collect();
    let column = |f: &dyn Fn(f64) -> f64| -> Vec<Cell> {
        closes.iter().map(|&c| Cell::Number(f(c))).collect()
    };
    let key = |field: &str| (field.to_string(), symbol.to_string());
    RawTable::two_level(
        index,
        vec![
            (key("Open"), column(&|c| c - 0.5)),
            (key("High"), column(&|c| c + 1.0)),
            (key("Low"), column(&|c| c - 1.0)),
            (key("Close"), column(&|c| c)),
            (key("Adj Close"), column(&|c| c * 0.98)),
            (key("Volume"), column(&|_| 1_000_000.0)),
        ],
    )
    .unwrap()
}
