//! Summary statistics over normalized data.

pub mod dividends;
pub mod moving_average;
pub mod price_summary;

pub use dividends::DividendSummary;
pub use moving_average::{latest_moving_average, moving_average};
pub use price_summary::PriceSummary;
