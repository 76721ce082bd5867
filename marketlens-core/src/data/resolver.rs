//! Point-in-time closing price lookup.

use chrono::{Days, NaiveDate};
use tracing::debug;

use super::normalize::{find_field, project_fields};
use super::provider::{AdjustmentMode, MarketDataProvider};
use super::raw_table::{Cell, RawTable};
use crate::domain::TickerSymbol;
use crate::schema::OhlcvField;

/// Default half-width of the fetch window around the target date.
pub const DEFAULT_WINDOW_DAYS: u64 = 5;

/// Maps a calendar date to the closing price of the nearest trading session.
///
/// The last session at or before the target wins; the first session after it
/// is used only when the window holds nothing earlier (target precedes listing).
pub struct TradingDayResolver<'a> {
    provider: &'a dyn MarketDataProvider,
    window_days: u64,
}

impl<'a> TradingDayResolver<'a> {
    pub fn new(provider: &'a dyn MarketDataProvider) -> Self {
        Self {
            provider,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }

    pub fn with_window_days(mut self, window_days: u64) -> Self {
        self.window_days = window_days;
        self
    }

    /// Closing price for `ticker` on or nearest to `target`, or `None`.
    pub fn resolve_closing_price(
        &self,
        ticker: &TickerSymbol,
        target: NaiveDate,
    ) -> Option<f64> {
        let start = target.checked_sub_days(Days::new(self.window_days))?;
        let end = target.checked_add_days(Days::new(self.window_days))?;

        let raw = self.fetch_window(ticker, start, end)?;
        let closes = closes_by_date(&raw, ticker)?;

        let price = nearest_close(&closes, target);
        debug!(%ticker, %target, ?price, sessions = closes.len(), "resolved closing price");
        price
    }

    /// Raw mode first, default mode only when that comes back empty.
    ///
    /// A fetch error ends the lookup.
    fn fetch_window(
        &self,
        ticker: &TickerSymbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Option<RawTable> {
        for mode in [AdjustmentMode::Raw, AdjustmentMode::Auto] {
            match self.provider.fetch_range(ticker, start, end, mode) {
                Ok(raw) if !raw.is_empty() => return Some(raw),
                Ok(_) => debug!(%ticker, %mode, "price window is empty"),
                Err(e) => {
                    debug!(%ticker, %mode, error = %e, "price window fetch failed");
                    return None;
                }
            }
        }
        None
    }
}

/// `(date, close)` pairs sorted by date, first row kept per date.
///
/// A session whose Close is unusable stays in the list as `None`.
fn closes_by_date(
    raw: &RawTable,
    ticker: &TickerSymbol,
) -> Option<Vec<(NaiveDate, Option<f64>)>> {
    let columns = project_fields(raw, ticker)?;
    let close = find_field(&columns, OhlcvField::Close)?;

    let mut closes: Vec<(NaiveDate, Option<f64>)> = raw
        .index()
        .iter()
        .zip(close)
        .map(|(ts, cell)| (ts.date(), Cell::to_number(cell)))
        .collect();
    closes.sort_by_key(|(d, _)| *d);
    closes.dedup_by_key(|(d, _)| *d);
    Some(closes)
}

fn nearest_close(closes: &[(NaiveDate, Option<f64>)], target: NaiveDate) -> Option<f64> {
    let idx = closes.partition_point(|(d, _)| *d < target);
    if let Some(&(d, close)) = closes.get(idx) {
        if d == target {
            return close;
        }
    }
    if idx > 0 {
        return closes[idx - 1].1;
    }
    closes.get(idx).and_then(|&(_, close)| close)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    #[test]
    fn exact_match_wins() {
        let closes = [(d(3), Some(1.0)), (d(4), Some(2.0)), (d(5), Some(3.0))];
        assert_eq!(nearest_close(&closes, d(4)), Some(2.0));
    }

    #[test]
    fn prior_session_preferred_over_next() {
        let closes = [(d(7), Some(1.0)), (d(10), Some(2.0))];
        assert_eq!(nearest_close(&closes, d(8)), Some(1.0));
        assert_eq!(nearest_close(&closes, d(9)), Some(1.0));
    }

    #[test]
    fn next_session_when_nothing_prior() {
        let closes = [(d(10), Some(2.0)), (d(11), Some(3.0))];
        assert_eq!(nearest_close(&closes, d(6)), Some(2.0));
    }

    #[test]
    fn target_after_last_session_uses_last() {
        let closes = [(d(10), Some(2.0)), (d(11), Some(3.0))];
        assert_eq!(nearest_close(&closes, d(14)), Some(3.0));
    }

    #[test]
    fn exact_session_without_close_is_absent() {
        let closes = [(d(7), Some(1.0)), (d(8), None)];
        assert_eq!(nearest_close(&closes, d(8)), None);
    }

    #[test]
    fn empty_is_absent() {
        assert_eq!(nearest_close(&[], d(4)), None);
    }
}
