//! MarketLens Core: market data retrieval, normalization and analytics.
//!
//! This crate contains everything below the presentation layer:
//! - Domain types (tickers, canonical OHLCV, dividends, fundamentals, statements)
//! - Raw provider tables and the Normalizer that shapes them
//! - The Retriever fallback ladder and the trading-day price resolver
//! - The Yahoo Finance provider with retry and circuit breaker
//! - Price, moving-average and dividend statistics
//! - The in-memory portfolio ledger and CSV export

pub mod analytics;
pub mod config;
pub mod data;
pub mod domain;
pub mod export;
pub mod format;
pub mod portfolio;
pub mod schema;

pub use config::MarketLensConfig;
pub use data::{
    DataError, MarketDataProvider, Normalizer, RetrievalFailure, RetrievalRequest, Retriever,
    TradingDayResolver, YahooProvider,
};
pub use domain::{CanonicalOhlcv, LookbackPeriod, TickerSymbol};
