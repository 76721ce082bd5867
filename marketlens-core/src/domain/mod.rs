//! Domain types for MarketLens

pub mod dividend;
pub mod fundamentals;
pub mod ohlcv;
pub mod statement;
pub mod ticker;

pub use dividend::Dividend;
pub use fundamentals::{AttributeValue, CompanyAttributes, KEY_METRICS, PROFILE_FIELDS};
pub use ohlcv::{CanonicalOhlcv, OhlcvRow};
pub use statement::{FinancialStatement, LineItem, Periodicity, StatementKind};
pub use ticker::{LookbackPeriod, TickerSymbol};
