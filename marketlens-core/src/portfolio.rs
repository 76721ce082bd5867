//! In-memory portfolio ledger.
//!
//! Owned by the caller for the length of a session; nothing is persisted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::provider::MarketDataProvider;
use crate::data::resolver::TradingDayResolver;
use crate::domain::TickerSymbol;

#[derive(Debug, Error, PartialEq)]
pub enum PortfolioError {
    #[error("quantity must be positive (got {0})")]
    InvalidQuantity(f64),

    #[error("{which} price must be positive (got {value})")]
    InvalidPrice { which: &'static str, value: f64 },

    #[error("no closing price found for {symbol} around {date}")]
    BuyPriceNotFound { symbol: TickerSymbol, date: NaiveDate },

    #[error("current price unavailable for {symbol}: {reason}")]
    CurrentPriceUnavailable { symbol: TickerSymbol, reason: String },
}

/// One purchase lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioEntry {
    pub symbol: TickerSymbol,
    pub buy_date: NaiveDate,
    pub buy_price: f64,
    pub current_price: f64,
    pub quantity: f64,
}

impl PortfolioEntry {
    /// Build an entry, resolving what the caller did not supply.
    ///
    /// Without `buy_price` the close of the nearest trading day to
    /// `buy_date` is used. The current price always comes from the
    /// provider's company attributes.
    pub fn resolve(
        provider: &dyn MarketDataProvider,
        resolver: &TradingDayResolver<'_>,
        symbol: TickerSymbol,
        buy_date: NaiveDate,
        quantity: f64,
        buy_price: Option<f64>,
    ) -> Result<Self, PortfolioError> {
        let buy_price = match buy_price {
            Some(price) => price,
            None => resolver
                .resolve_closing_price(&symbol, buy_date)
                .ok_or_else(|| PortfolioError::BuyPriceNotFound {
                    symbol: symbol.clone(),
                    date: buy_date,
                })?,
        };

        let current_price = provider
            .fetch_attributes(&symbol)
            .map_err(|e| PortfolioError::CurrentPriceUnavailable {
                symbol: symbol.clone(),
                reason: e.to_string(),
            })?
            .current_price()
            .ok_or_else(|| PortfolioError::CurrentPriceUnavailable {
                symbol: symbol.clone(),
                reason: "provider reported no current price".into(),
            })?;

        Ok(Self {
            symbol,
            buy_date,
            buy_price,
            current_price,
            quantity,
        })
    }

    pub fn cost(&self) -> f64 {
        self.buy_price * self.quantity
    }

    pub fn value(&self) -> f64 {
        self.current_price * self.quantity
    }

    pub fn profit_loss(&self) -> f64 {
        self.value() - self.cost()
    }

    pub fn return_pct(&self) -> f64 {
        (self.current_price - self.buy_price) / self.buy_price * 100.0
    }
}

/// Totals across the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub invested: f64,
    pub current_value: f64,
    pub profit_loss: f64,
    /// Zero when nothing is invested.
    pub return_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioLedger {
    entries: Vec<PortfolioEntry>,
}

impl PortfolioLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: PortfolioEntry) -> Result<(), PortfolioError> {
        if !(entry.quantity > 0.0 && entry.quantity.is_finite()) {
            return Err(PortfolioError::InvalidQuantity(entry.quantity));
        }
        for (which, value) in [("buy", entry.buy_price), ("current", entry.current_price)] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(PortfolioError::InvalidPrice { which, value });
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[PortfolioEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> PortfolioSummary {
        let invested: f64 = self.entries.iter().map(PortfolioEntry::cost).sum();
        let current_value: f64 = self.entries.iter().map(PortfolioEntry::value).sum();
        let profit_loss = current_value - invested;
        let return_pct = if invested > 0.0 {
            profit_loss / invested * 100.0
        } else {
            0.0
        };
        PortfolioSummary {
            invested,
            current_value,
            profit_loss,
            return_pct,
        }
    }
}
