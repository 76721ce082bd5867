//! Retriever: fallback ladder over provider calls.
//!
//! Strategies run strictly in order and stop at the first one whose response
//! normalizes. Only the strategies matching the request shape are applicable:
//!
//! | id            | shape    | mode |
//! |---------------|----------|------|
//! | `range-raw`   | range    | Raw  |
//! | `range-auto`  | range    | Auto |
//! | `period-raw`  | lookback | Raw  |
//! | `period-auto` | lookback | Auto |

use chrono::NaiveDate;
use std::fmt;
use tracing::{debug, info, warn};

use super::normalize::Normalizer;
use super::provider::{AdjustmentMode, DataError, MarketDataProvider};
use super::raw_table::RawTable;
use crate::domain::{CanonicalOhlcv, LookbackPeriod, TickerSymbol};

/// What to retrieve. Exactly one shape per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalRequest {
    Range {
        symbol: TickerSymbol,
        start: NaiveDate,
        end: NaiveDate,
    },
    Lookback {
        symbol: TickerSymbol,
        period: LookbackPeriod,
    },
}

impl RetrievalRequest {
    pub fn symbol(&self) -> &TickerSymbol {
        match self {
            RetrievalRequest::Range { symbol, .. } | RetrievalRequest::Lookback { symbol, .. } => {
                symbol
            }
        }
    }
}

/// Every applicable strategy failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalFailure {
    pub diagnostics: Vec<String>,
}

impl fmt::Display for RetrievalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostics.join("\n"))
    }
}

impl std::error::Error for RetrievalFailure {}

type Fetch<'r> = Box<dyn Fn() -> Result<RawTable, DataError> + 'r>;

struct Strategy<'r> {
    id: &'static str,
    fetch: Fetch<'r>,
}

/// Outcome of one strategy attempt.
enum Attempt {
    Success(CanonicalOhlcv),
    SoftFailure(String),
}

pub struct Retriever<'a> {
    provider: &'a dyn MarketDataProvider,
}

impl<'a> Retriever<'a> {
    pub fn new(provider: &'a dyn MarketDataProvider) -> Self {
        Self { provider }
    }

    /// Run the ladder for `request`.
    ///
    /// Never propagates provider errors: each is recorded as a diagnostic
    /// tagged with its strategy id.
    pub fn retrieve(&self, request: &RetrievalRequest) -> Result<CanonicalOhlcv, RetrievalFailure> {
        let symbol = request.symbol();
        let mut diagnostics = Vec::new();

        for strategy in self.strategies(request) {
            debug!(
                %symbol,
                strategy = strategy.id,
                provider = self.provider.name(),
                "attempting retrieval strategy"
            );
            match Self::attempt(&strategy, symbol) {
                Attempt::Success(table) => {
                    let rows = table.len();
                    info!(%symbol, strategy = strategy.id, rows, "retrieval succeeded");
                    return Ok(table);
                }
                Attempt::SoftFailure(diagnostic) => {
                    warn!(%symbol, "{diagnostic}");
                    diagnostics.push(diagnostic);
                }
            }
        }

        if diagnostics.is_empty() {
            diagnostics.push(format!("unknown error retrieving {symbol}: no applicable strategy"));
        }
        Err(RetrievalFailure { diagnostics })
    }

    fn attempt(strategy: &Strategy<'_>, symbol: &TickerSymbol) -> Attempt {
        match (strategy.fetch)() {
            Err(e) => Attempt::SoftFailure(format!("[{}] {e}", strategy.id)),
            Ok(raw) => match Normalizer::normalize(&raw, symbol) {
                Some(table) => Attempt::Success(table),
                None => Attempt::SoftFailure(format!(
                    "[{}] response contained no usable OHLCV data",
                    strategy.id
                )),
            },
        }
    }

    /// The applicable strategies for `request`, in ladder order.
    fn strategies<'r>(&'r self, request: &'r RetrievalRequest) -> Vec<Strategy<'r>> {
        let provider = self.provider;
        match request {
            RetrievalRequest::Range { symbol, start, end } => {
                if start > end {
                    debug!(%symbol, %start, %end, "date range is inverted, no strategy applies");
                    return Vec::new();
                }
                vec![
                    Strategy {
                        id: "range-raw",
                        fetch: Box::new(move || {
                            provider.fetch_range(symbol, *start, *end, AdjustmentMode::Raw)
                        }),
                    },
                    Strategy {
                        id: "range-auto",
                        fetch: Box::new(move || {
                            provider.fetch_range(symbol, *start, *end, AdjustmentMode::Auto)
                        }),
                    },
                ]
            }
            RetrievalRequest::Lookback { symbol, period } => vec![
                Strategy {
                    id: "period-raw",
                    fetch: Box::new(move || {
                        provider.fetch_period(symbol, *period, AdjustmentMode::Raw)
                    }),
                },
                Strategy {
                    id: "period-auto",
                    fetch: Box::new(move || {
                        provider.fetch_period(symbol, *period, AdjustmentMode::Auto)
                    }),
                },
            ],
        }
    }
}
