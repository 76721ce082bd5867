//! MarketLens CLI: price history, point-in-time prices, dividends, fundamentals, portfolio.
//!
//! Commands:
//! - `history`: normalized daily OHLCV via the fallback retriever
//! - `price`: closing price of the nearest trading day to a date
//! - `dividends`: dividend history and statistics
//! - `info`: company profile and key metrics
//! - `financials`: income statement, balance sheet or cash flow
//! - `portfolio`: value a set of purchases for this invocation

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use marketlens_core::analytics::{latest_moving_average, DividendSummary, PriceSummary};
use marketlens_core::domain::{
    CanonicalOhlcv, Dividend, LookbackPeriod, Periodicity, StatementKind, TickerSymbol,
};
use marketlens_core::export::{export_dividends_csv, export_history_csv};
use marketlens_core::format::{format_compact_currency, format_percent};
use marketlens_core::portfolio::{PortfolioEntry, PortfolioLedger};
use marketlens_core::schema::OhlcvField;
use marketlens_core::{
    MarketDataProvider, MarketLensConfig, RetrievalFailure, RetrievalRequest, Retriever,
    TradingDayResolver, YahooProvider,
};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "marketlens.toml";

#[derive(Parser)]
#[command(
    name = "marketlens",
    about = "MarketLens CLI: equity market data explorer",
    version
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily price history with summary statistics.
    History {
        /// Ticker symbol (e.g., AAPL, 005930.KS, BTC-USD, EURUSD=X).
        symbol: String,

        /// Lookback period: 1mo, 3mo, 6mo, 1y, 5y, 10y. Defaults to 1y.
        #[arg(long, conflicts_with_all = ["start", "end"])]
        period: Option<String>,

        /// Start date (YYYY-MM-DD). Defaults to one year before --end.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD, inclusive). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Number of most recent rows to print.
        #[arg(long, default_value_t = 10)]
        rows: usize,

        /// Write the full history to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Closing price on a date, or the nearest prior trading day.
    Price {
        symbol: String,

        /// Target date (YYYY-MM-DD).
        #[arg(long)]
        date: String,
    },
    /// Dividend history and statistics.
    Dividends {
        symbol: String,

        /// Write the payments to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Company profile and key metrics.
    Info { symbol: String },
    /// Financial statements.
    Financials {
        symbol: String,

        /// Statement kind: income, balance, cashflow.
        #[arg(long, default_value = "income")]
        kind: String,

        /// Quarterly instead of annual periods.
        #[arg(long, default_value_t = false)]
        quarterly: bool,
    },
    /// Value a set of purchases at current prices.
    Portfolio {
        /// Purchase as TICKER:DATE:QTY[:PRICE]; without PRICE the close of that day is used.
        #[arg(long = "entry", required = true)]
        entries: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let provider = YahooProvider::from_config(&config)?;

    match cli.command {
        Commands::History {
            symbol,
            period,
            start,
            end,
            rows,
            csv,
        } => run_history(&provider, &symbol, period, start, end, rows, csv.as_deref()),
        Commands::Price { symbol, date } => run_price(&provider, &config, &symbol, &date),
        Commands::Dividends { symbol, csv } => run_dividends(&provider, &symbol, csv.as_deref()),
        Commands::Info { symbol } => run_info(&provider, &symbol),
        Commands::Financials {
            symbol,
            kind,
            quarterly,
        } => run_financials(&provider, &symbol, &kind, quarterly),
        Commands::Portfolio { entries } => run_portfolio(&provider, &config, &entries),
    }
}

fn init_tracing(verbose: u8) {
    let default = if verbose > 0 { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<MarketLensConfig> {
    let config = match path {
        Some(path) => MarketLensConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            MarketLensConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => MarketLensConfig::default(),
    };
    debug!(?config, "loaded configuration");
    Ok(config)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)"))
}

fn parse_symbol(s: &str) -> Result<TickerSymbol> {
    Ok(TickerSymbol::new(s)?)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn build_request(
    symbol: TickerSymbol,
    period: Option<String>,
    start: Option<String>,
    end: Option<String>,
) -> Result<RetrievalRequest> {
    if start.is_none() && end.is_none() {
        let period = period.as_deref().unwrap_or("1y").parse::<LookbackPeriod>()?;
        return Ok(RetrievalRequest::Lookback { symbol, period });
    }

    let end = end.as_deref().map(parse_date).transpose()?.unwrap_or_else(today);
    let start = start
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(|| end - chrono::Duration::days(365));
    if start > end {
        bail!("--start {start} is after --end {end}");
    }
    Ok(RetrievalRequest::Range { symbol, start, end })
}

fn report_retrieval_failure(symbol: &TickerSymbol, failure: &RetrievalFailure) {
    eprintln!("Could not load price history for {symbol}:");
    for line in &failure.diagnostics {
        eprintln!("  {line}");
    }
    eprintln!();
    eprintln!("Things to try:");
    eprintln!("  - check the ticker format (AAPL, 005930.KS, BTC-USD, EURUSD=X)");
    eprintln!("  - request a longer period or a wider date range");
    eprintln!("  - check your network connection and retry in a few minutes");
}

fn print_frame(df: &DataFrame) {
    // Show every row we were asked for instead of polars' head/tail elision.
    std::env::set_var("POLARS_FMT_MAX_ROWS", df.height().max(1).to_string());
    println!("{df}");
}

fn run_history(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    period: Option<String>,
    start: Option<String>,
    end: Option<String>,
    rows: usize,
    csv: Option<&Path>,
) -> Result<()> {
    let symbol = parse_symbol(symbol)?;
    let request = build_request(symbol.clone(), period, start, end)?;

    let table = match Retriever::new(provider).retrieve(&request) {
        Ok(table) => table,
        Err(failure) => {
            report_retrieval_failure(&symbol, &failure);
            std::process::exit(1);
        }
    };

    print_history(&table, rows)?;

    if let Some(path) = csv {
        let data = export_history_csv(&table)?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("\nSaved {} rows to {}", table.len(), path.display());
    }
    Ok(())
}

fn print_history(table: &CanonicalOhlcv, rows: usize) -> Result<()> {
    println!("{}: {} rows", table.symbol(), table.len());
    if let (Some(first), Some(last)) = (table.first_date(), table.last_date()) {
        println!("Range: {first} to {last}");
    }

    match PriceSummary::from_table(table) {
        Some(summary) => {
            println!();
            println!("Current price:  ${:.2}", summary.last_close);
            println!(
                "Change:         ${:.2} ({})",
                summary.change,
                format_percent(summary.change_pct)
            );
            if let Some(volume) = summary.last_volume {
                println!("Volume:         {volume:.0}");
            }
            println!("Average close:  ${:.2}", summary.mean_close);
            println!("Trading days:   {}", summary.trading_days);
        }
        None => println!("No rows with complete prices; statistics unavailable."),
    }

    let closes: Vec<Option<f64>> = table
        .complete_rows()
        .iter()
        .map(|r| r.get(OhlcvField::Close))
        .collect();
    for window in [20, 50] {
        if let Some(ma) = latest_moving_average(&closes, window) {
            println!("MA{window}:           ${ma:.2}");
        }
    }

    println!();
    print_frame(&table.recent_complete_dataframe(rows)?);
    Ok(())
}

fn run_price(
    provider: &dyn MarketDataProvider,
    config: &MarketLensConfig,
    symbol: &str,
    date: &str,
) -> Result<()> {
    let symbol = parse_symbol(symbol)?;
    let date = parse_date(date)?;
    let resolver =
        TradingDayResolver::new(provider).with_window_days(config.resolver.window_days);

    match resolver.resolve_closing_price(&symbol, date) {
        Some(price) => println!("{symbol} close for {date}: ${price:.2}"),
        None => println!("No price found for {symbol} around {date}."),
    }
    Ok(())
}

/// Number of payments listed by `dividends`.
const RECENT_DIVIDENDS: usize = 20;

/// The last `n` payments, newest first, amounts rounded to 4 decimals.
fn recent_dividends_frame(dividends: &[Dividend], n: usize) -> Result<DataFrame> {
    let recent: Vec<&Dividend> = dividends.iter().rev().take(n).collect();
    let dates: Vec<String> = recent.iter().map(|d| d.date.to_string()).collect();
    let amounts: Vec<f64> = recent
        .iter()
        .map(|d| (d.amount * 10_000.0).round() / 10_000.0)
        .collect();
    Ok(DataFrame::new(vec![
        Column::new("Date".into(), dates),
        Column::new("Dividend".into(), amounts),
    ])?)
}

fn run_dividends(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    csv: Option<&Path>,
) -> Result<()> {
    let symbol = parse_symbol(symbol)?;
    let dividends = provider.fetch_dividends(&symbol)?;

    let Some(summary) = DividendSummary::from_dividends(&dividends) else {
        println!("{symbol} has no dividend history.");
        return Ok(());
    };

    println!("{symbol} dividends");
    println!("Most recent:   ${:.4}", summary.most_recent);
    println!("Average:       ${:.4}", summary.mean);
    println!("Largest:       ${:.4}", summary.max);
    println!("Payments:      {}", summary.count);
    if let Some(growth) = summary.yoy_growth_pct {
        println!("YoY growth:    {}", format_percent(growth));
    }

    let years: Vec<i32> = summary.annual_totals.keys().copied().collect();
    let totals: Vec<f64> = summary.annual_totals.values().copied().collect();
    let annual = DataFrame::new(vec![
        Column::new("Year".into(), years),
        Column::new("Total".into(), totals),
    ])?;
    println!("\nAnnual totals");
    print_frame(&annual);

    println!("\nRecent dividends");
    print_frame(&recent_dividends_frame(&dividends, RECENT_DIVIDENDS)?);

    if let Some(path) = csv {
        let data = export_dividends_csv(&dividends)?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("\nSaved {} payments to {}", dividends.len(), path.display());
    }
    Ok(())
}

fn run_info(provider: &dyn MarketDataProvider, symbol: &str) -> Result<()> {
    let symbol = parse_symbol(symbol)?;
    let attributes = provider.fetch_attributes(&symbol)?;
    if attributes.is_empty() {
        println!("No company information available for {symbol}.");
        return Ok(());
    }

    println!("{symbol}");
    for (label, value) in attributes.profile() {
        println!("{label:<16}{value}");
    }
    if let Some(price) = attributes.current_price() {
        println!("{:<16}${price:.2}", "Current price");
    }
    let week_52 = [
        ("52-week high", attributes.fifty_two_week_high()),
        ("52-week low", attributes.fifty_two_week_low()),
    ];
    for (label, value) in week_52 {
        match value {
            Some(v) => println!("{label:<16}${v:.2}"),
            None => println!("{label:<16}N/A"),
        }
    }

    println!("\nKey metrics");
    for (label, value) in attributes.key_metrics() {
        println!("{label:<16}{value}");
    }

    if let Some(summary) = attributes.business_summary() {
        println!("\n{summary}");
    }
    Ok(())
}

fn run_financials(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    kind: &str,
    quarterly: bool,
) -> Result<()> {
    let symbol = parse_symbol(symbol)?;
    let kind: StatementKind = kind.parse()?;
    let periodicity = if quarterly {
        Periodicity::Quarterly
    } else {
        Periodicity::Annual
    };

    let statement = provider.fetch_financial_statement(&symbol, kind, periodicity)?;
    if statement.is_empty() {
        println!("No {} data available for {symbol}.", kind.title());
        return Ok(());
    }

    println!("{symbol} {} ({})", kind.title(), periodicity.prefix());
    print_frame(&statement.to_dataframe()?);
    Ok(())
}

/// `TICKER:DATE:QTY[:PRICE]`
fn parse_entry_arg(arg: &str) -> Result<(TickerSymbol, NaiveDate, f64, Option<f64>)> {
    let parts: Vec<&str> = arg.split(':').collect();
    let (symbol, date, qty, price) = match parts.as_slice() {
        [symbol, date, qty] => (symbol, date, qty, None),
        [symbol, date, qty, price] => (symbol, date, qty, Some(price)),
        _ => bail!("invalid entry '{arg}' (expected TICKER:DATE:QTY[:PRICE])"),
    };
    let qty: f64 = qty
        .parse()
        .with_context(|| format!("invalid quantity '{qty}' in '{arg}'"))?;
    let price = price
        .map(|p| p.parse::<f64>().with_context(|| format!("invalid price '{p}' in '{arg}'")))
        .transpose()?;
    Ok((parse_symbol(symbol)?, parse_date(date)?, qty, price))
}

fn run_portfolio(
    provider: &dyn MarketDataProvider,
    config: &MarketLensConfig,
    args: &[String],
) -> Result<()> {
    let resolver =
        TradingDayResolver::new(provider).with_window_days(config.resolver.window_days);
    let mut ledger = PortfolioLedger::new();

    for arg in args {
        let (symbol, date, qty, price) = parse_entry_arg(arg)?;
        let entry = PortfolioEntry::resolve(provider, &resolver, symbol, date, qty, price)?;
        ledger.add(entry)?;
    }

    let entries = ledger.entries();
    let numbers = |name: &str, f: fn(&PortfolioEntry) -> f64| {
        Column::new(name.into(), entries.iter().map(f).collect::<Vec<_>>())
    };
    let symbols: Vec<String> = entries.iter().map(|e| e.symbol.to_string()).collect();
    let buy_dates: Vec<String> = entries.iter().map(|e| e.buy_date.to_string()).collect();
    let frame = DataFrame::new(vec![
        Column::new("Symbol".into(), symbols),
        Column::new("Buy date".into(), buy_dates),
        numbers("Quantity", |e| e.quantity),
        numbers("Buy price", |e| e.buy_price),
        numbers("Current price", |e| e.current_price),
        numbers("P/L", PortfolioEntry::profit_loss),
        numbers("Return %", PortfolioEntry::return_pct),
    ])?;
    print_frame(&frame);

    let summary = ledger.summary();
    println!();
    println!("Invested:       {}", format_compact_currency(summary.invested));
    println!("Current value:  {}", format_compact_currency(summary.current_value));
    println!("Profit/loss:    {}", format_compact_currency(summary.profit_loss));
    println!("Return:         {}", format_percent(summary.return_pct));
    Ok(())
}
