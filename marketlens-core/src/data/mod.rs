//! Data retrieval: provider access, normalization and point-in-time lookup.

pub mod circuit_breaker;
pub mod normalize;
pub mod provider;
pub mod raw_table;
pub mod resolver;
pub mod retriever;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use normalize::Normalizer;
pub use provider::{AdjustmentMode, DataError, MarketDataProvider};
pub use raw_table::{Cell, ColumnAxis, RawTable};
pub use resolver::TradingDayResolver;
pub use retriever::{RetrievalFailure, RetrievalRequest, Retriever};
pub use yahoo::YahooProvider;
