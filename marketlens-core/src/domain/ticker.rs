use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::data::provider::DataError;

/// Ticker symbol as understood by the market data provider.
///
/// Always trimmed and upper-cased: `aapl` → `AAPL`, `005930.ks` → `005930.KS`,
/// `btc-usd` → `BTC-USD`, `eurusd=x` → `EURUSD=X`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TickerSymbol(String);

impl TickerSymbol {
    pub fn new(raw: &str) -> Result<Self, DataError> {
        let symbol = raw.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(DataError::ValidationError("ticker symbol is empty".into()));
        }
        if symbol.chars().any(char::is_whitespace) {
            return Err(DataError::ValidationError(format!(
                "ticker symbol '{symbol}' contains whitespace"
            )));
        }
        Ok(Self(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if a column label names this ticker (ASCII case-insensitive).
    pub fn matches_label(&self, label: &str) -> bool {
        label.trim().eq_ignore_ascii_case(&self.0)
    }
}

impl FromStr for TickerSymbol {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lookback window for period-based history requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookbackPeriod {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    FiveYears,
    TenYears,
}

impl LookbackPeriod {
    pub const ALL: [LookbackPeriod; 6] = [
        LookbackPeriod::OneMonth,
        LookbackPeriod::ThreeMonths,
        LookbackPeriod::SixMonths,
        LookbackPeriod::OneYear,
        LookbackPeriod::FiveYears,
        LookbackPeriod::TenYears,
    ];

    /// Provider range code (`1mo`, `3mo`, `6mo`, `1y`, `5y`, `10y`).
    pub fn code(self) -> &'static str {
        match self {
            LookbackPeriod::OneMonth => "1mo",
            LookbackPeriod::ThreeMonths => "3mo",
            LookbackPeriod::SixMonths => "6mo",
            LookbackPeriod::OneYear => "1y",
            LookbackPeriod::FiveYears => "5y",
            LookbackPeriod::TenYears => "10y",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            LookbackPeriod::OneMonth => "1 month",
            LookbackPeriod::ThreeMonths => "3 months",
            LookbackPeriod::SixMonths => "6 months",
            LookbackPeriod::OneYear => "1 year",
            LookbackPeriod::FiveYears => "5 years",
            LookbackPeriod::TenYears => "10 years",
        }
    }
}

impl FromStr for LookbackPeriod {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.code() == code)
            .ok_or_else(|| {
                DataError::ValidationError(format!(
                    "unknown lookback period '{s}' (expected one of 1mo, 3mo, 6mo, 1y, 5y, 10y)"
                ))
            })
    }
}

impl fmt::Display for LookbackPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
