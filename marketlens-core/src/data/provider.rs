//! Market data provider trait and structured error types.
//!
//! The MarketDataProvider trait abstracts over data sources (Yahoo Finance
//! today) so the retrieval layer can be exercised against scripted providers
//! in tests. Providers return raw, unnormalized responses; shaping them is the
//! Normalizer's job.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::raw_table::RawTable;
use crate::domain::{
    CompanyAttributes, Dividend, FinancialStatement, LookbackPeriod, Periodicity, StatementKind,
    TickerSymbol,
};

/// Structured error types for data operations.
///
/// Messages are single-line so they can be embedded in retrieval diagnostics
/// and shown in the CLI as-is.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("export error: {0}")]
    ExportError(String),

    #[error("data error: {0}")]
    Other(String),
}

/// How the provider should treat split/dividend adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdjustmentMode {
    /// Prices as traded, with the adjusted close reported in its own column.
    Raw,
    /// Provider default: OHLC scaled by the adjustment factor, no adjusted-close column.
    Auto,
}

impl fmt::Display for AdjustmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjustmentMode::Raw => f.write_str("raw"),
            AdjustmentMode::Auto => f.write_str("auto"),
        }
    }
}

/// Trait for market data providers.
///
/// All calls are blocking. Any call may fail with a `DataError`; callers in
/// this crate never let those errors escape the retrieval layer.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Daily price history over an inclusive date range.
    fn fetch_range(
        &self,
        symbol: &TickerSymbol,
        start: NaiveDate,
        end: NaiveDate,
        mode: AdjustmentMode,
    ) -> Result<RawTable, DataError>;

    /// Daily price history over a lookback period ending today.
    fn fetch_period(
        &self,
        symbol: &TickerSymbol,
        period: LookbackPeriod,
        mode: AdjustmentMode,
    ) -> Result<RawTable, DataError>;

    /// Company profile and headline metrics.
    fn fetch_attributes(&self, symbol: &TickerSymbol) -> Result<CompanyAttributes, DataError>;

    /// Full dividend history, oldest first.
    fn fetch_dividends(&self, symbol: &TickerSymbol) -> Result<Vec<Dividend>, DataError>;

    /// One financial statement.
    fn fetch_financial_statement(
        &self,
        symbol: &TickerSymbol,
        kind: StatementKind,
        periodicity: Periodicity,
    ) -> Result<FinancialStatement, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}
