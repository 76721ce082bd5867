//! Yahoo Finance data provider.
//!
//! Price history and dividends come from the v8 chart API, company attributes
//! from quoteSummary (which needs a cookie-backed crumb), and financial
//! statements from the fundamentals time-series API. All calls share one
//! retry/backoff loop and the circuit breaker.
//!
//! Yahoo has no official API and changes response shapes without notice, so
//! history is handed back as a loose `RawTable` and left to the Normalizer.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

use super::circuit_breaker::CircuitBreaker;
use super::provider::{AdjustmentMode, DataError, MarketDataProvider};
use super::raw_table::{Cell, RawTable};
use crate::config::{MarketLensConfig, ProviderConfig};
use crate::domain::{
    AttributeValue, CompanyAttributes, Dividend, FinancialStatement, LineItem, LookbackPeriod,
    Periodicity, StatementKind, TickerSymbol,
};

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart/";
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary/";
const TIMESERIES_URL: &str =
    "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries/";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query2.finance.yahoo.com/v1/test/getcrumb";

const SUMMARY_MODULES: &str = "assetProfile,summaryDetail,financialData,defaultKeyStatistics,price";

/// Earliest `period1` accepted by the time-series API (mid 1985).
const TIMESERIES_EPOCH: i64 = 493_590_046;

const INCOME_ITEMS: &[&str] = &[
    "TotalRevenue",
    "CostOfRevenue",
    "GrossProfit",
    "OperatingExpense",
    "OperatingIncome",
    "PretaxIncome",
    "TaxProvision",
    "NetIncome",
    "BasicEPS",
    "DilutedEPS",
    "EBITDA",
];

const BALANCE_ITEMS: &[&str] = &[
    "TotalAssets",
    "CurrentAssets",
    "CashAndCashEquivalents",
    "TotalLiabilitiesNetMinorityInterest",
    "CurrentLiabilities",
    "LongTermDebt",
    "StockholdersEquity",
    "RetainedEarnings",
    "TotalDebt",
];

const CASH_FLOW_ITEMS: &[&str] = &[
    "OperatingCashFlow",
    "InvestingCashFlow",
    "FinancingCashFlow",
    "CapitalExpenditure",
    "FreeCashFlow",
    "RepurchaseOfCapitalStock",
    "CashDividendsPaid",
];

/// Line items requested for each statement kind, in display order.
pub fn statement_line_items(kind: StatementKind) -> &'static [&'static str] {
    match kind {
        StatementKind::Income => INCOME_ITEMS,
        StatementKind::Balance => BALANCE_ITEMS,
        StatementKind::CashFlow => CASH_FLOW_ITEMS,
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
    #[serde(default)]
    events: ChartEvents,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    symbol: String,
    #[serde(default)]
    gmtoffset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
    #[serde(default)]
    adjclose: Vec<AdjCloseData>,
}

/// Values stay loose: Yahoo sends nulls for halted sessions and has sent
/// strings in the past.
#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Value>,
    #[serde(default)]
    high: Vec<Value>,
    #[serde(default)]
    low: Vec<Value>,
    #[serde(default)]
    close: Vec<Value>,
    #[serde(default)]
    volume: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    #[serde(default)]
    adjclose: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartEvents {
    #[serde(default)]
    dividends: BTreeMap<String, DividendEvent>,
}

#[derive(Debug, Deserialize)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
    crumb: Mutex<Option<String>>,
}

impl YahooProvider {
    pub fn new(
        config: &ProviderConfig,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .cookie_store(true)
            .build()
            .map_err(|e| DataError::ConfigError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            max_retries: config.max_retries,
            base_delay: config.base_delay(),
            crumb: Mutex::new(None),
        })
    }

    pub fn from_config(config: &MarketLensConfig) -> Result<Self, DataError> {
        Self::new(&config.provider, Arc::new(config.circuit_breaker.build()))
    }

    fn range_url(
        symbol: &TickerSymbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Url, DataError> {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        // period2 is exclusive; move it past `end` so the last day is included.
        let after_end = end.checked_add_days(Days::new(1)).unwrap_or(end);
        let period2 = after_end.and_time(NaiveTime::MIN).and_utc().timestamp();
        chart_url(
            symbol,
            &[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".into()),
                ("includeAdjustedClose", "true".into()),
            ],
        )
    }

    fn period_url(symbol: &TickerSymbol, period: LookbackPeriod) -> Result<Url, DataError> {
        chart_url(
            symbol,
            &[
                ("range", period.code().into()),
                ("interval", "1d".into()),
                ("includeAdjustedClose", "true".into()),
            ],
        )
    }

    fn dividends_url(symbol: &TickerSymbol) -> Result<Url, DataError> {
        chart_url(
            symbol,
            &[
                ("range", "max".into()),
                ("interval", "1mo".into()),
                ("events", "div".into()),
            ],
        )
    }

    fn statement_url(
        symbol: &TickerSymbol,
        kind: StatementKind,
        periodicity: Periodicity,
        now: DateTime<Utc>,
    ) -> Result<Url, DataError> {
        let types = statement_line_items(kind)
            .iter()
            .map(|item| format!("{}{item}", periodicity.prefix()))
            .collect::<Vec<_>>()
            .join(",");
        let base = format!("{TIMESERIES_URL}{}", symbol.as_str());
        Url::parse_with_params(
            &base,
            &[
                ("symbol", symbol.as_str().to_string()),
                ("type", types),
                ("period1", TIMESERIES_EPOCH.to_string()),
                ("period2", now.timestamp().to_string()),
            ],
        )
        .map_err(|e| DataError::Other(format!("invalid URL for {symbol}: {e}")))
    }

    /// Fetch and cache a crumb. Yahoo sets the session cookie on `fc.yahoo.com`
    /// and then hands out a crumb bound to that cookie.
    fn ensure_crumb(&self) -> Result<String, DataError> {
        let mut cached = self.crumb.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        debug!("fetching Yahoo session crumb");
        // fc.yahoo.com answers 404 but still sets the cookie.
        self.client
            .get(COOKIE_URL)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let resp = self
            .client
            .get(CRUMB_URL)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.circuit_breaker.record_failure();
            return Err(DataError::RateLimited { retry_after_secs: 60 });
        }
        let crumb = resp
            .text()
            .map_err(|e| DataError::ResponseFormatChanged(format!("failed to read crumb: {e}")))?
            .trim()
            .to_string();
        if !status.is_success() || crumb.is_empty() || crumb.contains('<') {
            return Err(DataError::AuthenticationRequired(format!(
                "Yahoo Finance refused a session crumb (HTTP {status})"
            )));
        }

        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    fn clear_crumb(&self) {
        *self.crumb.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// GET `url` as JSON with retry, backoff and circuit breaker handling.
    fn get_json(&self, url: &Url, symbol: &TickerSymbol) -> Result<Value, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(%symbol, attempt, delay_ms = delay.as_millis() as u64, "retrying request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            debug!(%symbol, url = %url, "GET");
            let resp = match self.client.get(url.clone()).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    warn!(%symbol, error = %e, "transport failure");
                    self.circuit_breaker.record_failure();
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            match status {
                reqwest::StatusCode::FORBIDDEN => {
                    // IP ban
                    self.circuit_breaker.trip();
                    return Err(DataError::CircuitBreakerTripped);
                }
                reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    self.circuit_breaker.record_failure();
                    let retry_after = resp
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(60);
                    warn!(%symbol, retry_after, "rate limited");
                    last_error = Some(DataError::RateLimited {
                        retry_after_secs: retry_after,
                    });
                    continue;
                }
                reqwest::StatusCode::UNAUTHORIZED => {
                    self.clear_crumb();
                    return Err(DataError::AuthenticationRequired(format!(
                        "Yahoo Finance rejected the session for {symbol}"
                    )));
                }
                reqwest::StatusCode::NOT_FOUND => {
                    return Err(DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    });
                }
                s if s.is_server_error() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(DataError::Other(format!("HTTP {s} for {symbol}")));
                    continue;
                }
                s if !s.is_success() => {
                    return Err(DataError::Other(format!("HTTP {s} for {symbol}")));
                }
                _ => {}
            }

            let body: Value = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!(
                    "failed to parse response for {symbol}: {e}"
                ))
            })?;
            self.circuit_breaker.record_success();
            return Ok(body);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }

    fn get_chart(&self, url: &Url, symbol: &TickerSymbol) -> Result<ChartResponse, DataError> {
        let body = self.get_json(url, symbol)?;
        serde_json::from_value(body).map_err(|e| {
            DataError::ResponseFormatChanged(format!("unexpected chart payload for {symbol}: {e}"))
        })
    }
}

fn chart_url(symbol: &TickerSymbol, params: &[(&str, String)]) -> Result<Url, DataError> {
    let base = format!("{CHART_URL}{}", symbol.as_str());
    Url::parse_with_params(&base, params)
        .map_err(|e| DataError::Other(format!("invalid URL for {symbol}: {e}")))
}

fn api_error(symbol: &TickerSymbol, error: Option<ApiError>) -> DataError {
    match error {
        Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        Some(err) => DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)),
        None => DataError::ResponseFormatChanged("empty result with no error".into()),
    }
}

fn first_chart(symbol: &TickerSymbol, resp: ChartResponse) -> Result<ChartData, DataError> {
    let ChartEnvelope { result, error } = resp.chart;
    result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| api_error(symbol, error))
}

/// Exchange-local timestamp.
fn local_time(ts: i64, gmtoffset: i64) -> Result<NaiveDateTime, DataError> {
    DateTime::from_timestamp(ts + gmtoffset, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))
}

fn value_to_cell(value: &Value) -> Cell {
    match value {
        Value::Number(n) => n.as_f64().map_or(Cell::Missing, Cell::Number),
        Value::String(s) => Cell::Text(s.clone()),
        _ => Cell::Missing,
    }
}

fn cells(values: &[Value], n: usize) -> Vec<Cell> {
    (0..n)
        .map(|i| values.get(i).map_or(Cell::Missing, value_to_cell))
        .collect()
}

/// Parse a chart response into a two-level `(field, symbol)` table.
///
/// Raw mode keeps prices as traded and adds `Adj Close`. Auto mode scales
/// OHLC by `adjclose / close` per row and drops `Adj Close`.
fn parse_history(
    symbol: &TickerSymbol,
    resp: ChartResponse,
    mode: AdjustmentMode,
) -> Result<RawTable, DataError> {
    let data = first_chart(symbol, resp)?;
    let n = data.timestamp.len();
    if n == 0 {
        debug!(%symbol, "chart response has no sessions");
        return Ok(RawTable::empty());
    }

    let gmtoffset = data.meta.gmtoffset.unwrap_or(0);
    let index = data
        .timestamp
        .iter()
        .map(|&ts| local_time(ts, gmtoffset))
        .collect::<Result<Vec<_>, _>>()?;

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;
    let adj_close = data
        .indicators
        .adjclose
        .first()
        .map(|a| cells(&a.adjclose, n))
        .unwrap_or_else(|| vec![Cell::Missing; n]);

    let mut open = cells(&quote.open, n);
    let mut high = cells(&quote.high, n);
    let mut low = cells(&quote.low, n);
    let mut close = cells(&quote.close, n);
    let volume = cells(&quote.volume, n);

    if mode == AdjustmentMode::Auto {
        for i in 0..n {
            let factor = match (adj_close[i].to_number(), close[i].to_number()) {
                (Some(adj), Some(c)) if c != 0.0 => adj / c,
                _ => 1.0,
            };
            for column in [&mut open, &mut high, &mut low, &mut close] {
                if let Some(v) = column[i].to_number() {
                    column[i] = Cell::Number(v * factor);
                }
            }
        }
    }

    let ticker = data.meta.symbol;
    let key = |field: &str| (field.to_string(), ticker.clone());
    let mut columns = vec![
        (key("Open"), open),
        (key("High"), high),
        (key("Low"), low),
        (key("Close"), close),
    ];
    if mode == AdjustmentMode::Raw {
        columns.push((key("Adj Close"), adj_close));
    }
    columns.push((key("Volume"), volume));

    RawTable::two_level(index, columns)
}

fn parse_dividends(symbol: &TickerSymbol, resp: ChartResponse) -> Result<Vec<Dividend>, DataError> {
    let data = first_chart(symbol, resp)?;
    let gmtoffset = data.meta.gmtoffset.unwrap_or(0);
    let mut dividends = data
        .events
        .dividends
        .into_values()
        .filter(|event| event.amount.is_finite() && event.amount > 0.0)
        .map(|event| {
            local_time(event.date, gmtoffset).map(|ts| Dividend {
                date: ts.date(),
                amount: event.amount,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    dividends.sort_by_key(|d| d.date);
    Ok(dividends)
}

fn json_to_attribute(value: &Value) -> Option<AttributeValue> {
    match value {
        Value::Number(n) => n.as_f64().map(AttributeValue::Number),
        Value::String(s) if !s.trim().is_empty() => Some(AttributeValue::Text(s.clone())),
        Value::Object(obj) => obj
            .get("raw")
            .and_then(Value::as_f64)
            .map(AttributeValue::Number),
        _ => None,
    }
}

/// Flatten quoteSummary modules into one attribute map. Earlier modules win
/// on duplicate keys.
fn parse_attributes(symbol: &TickerSymbol, body: Value) -> Result<CompanyAttributes, DataError> {
    let summary = body
        .get("quoteSummary")
        .ok_or_else(|| DataError::ResponseFormatChanged("missing quoteSummary".into()))?;
    let result = summary
        .get("result")
        .and_then(Value::as_array)
        .and_then(|r| r.first());
    let Some(result) = result else {
        let error = summary
            .get("error")
            .cloned()
            .and_then(|e| serde_json::from_value::<ApiError>(e).ok());
        return Err(api_error(symbol, error));
    };

    let mut attributes = CompanyAttributes::new();
    for module in SUMMARY_MODULES.split(',') {
        let Some(fields) = result.get(module).and_then(Value::as_object) else {
            continue;
        };
        for (key, value) in fields {
            if attributes.get(key).is_some() {
                continue;
            }
            if let Some(attr) = json_to_attribute(value) {
                attributes.insert(key.clone(), attr);
            }
        }
    }
    Ok(attributes)
}

fn parse_statement(
    symbol: &TickerSymbol,
    kind: StatementKind,
    periodicity: Periodicity,
    body: Value,
) -> Result<FinancialStatement, DataError> {
    let results = body
        .pointer("/timeseries/result")
        .and_then(Value::as_array)
        .ok_or_else(|| DataError::ResponseFormatChanged("missing timeseries result".into()))?;

    let mut series: BTreeMap<&str, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for result in results {
        let Some(key) = result.pointer("/meta/type/0").and_then(Value::as_str) else {
            continue;
        };
        let Some(name) = key.strip_prefix(periodicity.prefix()) else {
            continue;
        };
        let Some(entries) = result.get(key).and_then(Value::as_array) else {
            continue;
        };
        let values = series.entry(name).or_default();
        for entry in entries {
            let date = entry
                .get("asOfDate")
                .and_then(Value::as_str)
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
            let value = entry
                .pointer("/reportedValue/raw")
                .and_then(Value::as_f64)
                .filter(|v| v.is_finite());
            if let (Some(date), Some(value)) = (date, value) {
                values.insert(date, value);
            }
        }
    }

    let periods: Vec<NaiveDate> = series
        .values()
        .flat_map(|v| v.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .rev()
        .collect();

    let line_items = statement_line_items(kind)
        .iter()
        .filter_map(|&name| {
            let values = series.get(name).filter(|v| !v.is_empty())?;
            Some(LineItem {
                name: name.to_string(),
                values: periods.iter().map(|p| values.get(p).copied()).collect(),
            })
        })
        .collect();

    Ok(FinancialStatement {
        symbol: symbol.clone(),
        kind,
        periodicity,
        periods,
        line_items,
    })
}

impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_range(
        &self,
        symbol: &TickerSymbol,
        start: NaiveDate,
        end: NaiveDate,
        mode: AdjustmentMode,
    ) -> Result<RawTable, DataError> {
        let url = Self::range_url(symbol, start, end)?;
        let chart = self.get_chart(&url, symbol)?;
        parse_history(symbol, chart, mode)
    }

    fn fetch_period(
        &self,
        symbol: &TickerSymbol,
        period: LookbackPeriod,
        mode: AdjustmentMode,
    ) -> Result<RawTable, DataError> {
        let url = Self::period_url(symbol, period)?;
        let chart = self.get_chart(&url, symbol)?;
        parse_history(symbol, chart, mode)
    }

    fn fetch_attributes(&self, symbol: &TickerSymbol) -> Result<CompanyAttributes, DataError> {
        let crumb = self.ensure_crumb()?;
        let base = format!("{QUOTE_SUMMARY_URL}{}", symbol.as_str());
        let params = [("modules", SUMMARY_MODULES), ("crumb", crumb.as_str())];
        let url = Url::parse_with_params(&base, &params)
            .map_err(|e| DataError::Other(format!("invalid URL for {symbol}: {e}")))?;
        let body = self.get_json(&url, symbol)?;
        parse_attributes(symbol, body)
    }

    fn fetch_dividends(&self, symbol: &TickerSymbol) -> Result<Vec<Dividend>, DataError> {
        let url = Self::dividends_url(symbol)?;
        let chart = self.get_chart(&url, symbol)?;
        parse_dividends(symbol, chart)
    }

    fn fetch_financial_statement(
        &self,
        symbol: &TickerSymbol,
        kind: StatementKind,
        periodicity: Periodicity,
    ) -> Result<FinancialStatement, DataError> {
        let url = Self::statement_url(symbol, kind, periodicity, Utc::now())?;
        let body = self.get_json(&url, symbol)?;
        parse_statement(symbol, kind, periodicity, body)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
