//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_quote_adapter::CsvQuoteAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::history_export::write_csv;
use crate::adapters::json_ledger::JsonLedger;
use crate::adapters::memory_ledger::MemoryLedger;
use crate::adapters::mock_quote_adapter::MockQuoteAdapter;
use crate::adapters::system_clock::SystemClock;
use crate::adapters::timed_quote_adapter::TimedQuoteAdapter;
use crate::domain::error::PapertraderError;
use crate::domain::gateway::{OrderRequest, TradeGateway};
use crate::domain::portfolio_service::PortfolioService;
use crate::domain::reconstruction::{Reconstruction, reconstruct};
use crate::domain::settings::{LedgerBackend, QuoteSource, Settings, build_settings};
use crate::domain::trade::{TradeRecord, format_timestamp};
use crate::domain::valuation::PortfolioSnapshot;
use crate::ports::clock_port::Clock;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::quote_port::QuotePort;

#[derive(Parser, Debug)]
#[command(name = "papertrader", about = "Paper-trading ledger and portfolio valuation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a simulated trade
    Trade {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        quantity: i64,
        /// BUY or SELL
        #[arg(long)]
        action: String,
        /// Execution price; quoted from the configured source when omitted
        #[arg(long)]
        price: Option<Decimal>,
    },
    /// Look up the current price of a symbol
    Quote {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        json: bool,
    },
    /// Show the valued portfolio
    Portfolio {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List executed trades, newest first
    History {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
        /// Write CSV to stdout instead of a table
        #[arg(long)]
        csv: bool,
    },
    /// Replay the ledger and report its integrity
    Verify {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Start the HTTP API
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Services wired to the configured ledger, quote source and clock.
pub struct App {
    pub portfolio: Arc<PortfolioService>,
    pub gateway: Arc<TradeGateway>,
}

impl App {
    pub fn new(
        settings: &Settings,
        ledger: Arc<dyn LedgerPort + Send + Sync>,
        quotes: Arc<dyn QuotePort + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let portfolio =
            PortfolioService::new(Arc::clone(&ledger), Arc::clone(&quotes), settings.starting_cash);
        let gateway = TradeGateway::new(ledger, quotes, clock, settings.starting_cash)
            .with_buying_power_check(settings.enforce_buying_power);
        App {
            portfolio: Arc::new(portfolio),
            gateway: Arc::new(gateway),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, PapertraderError> {
        Ok(Self::new(
            settings,
            open_ledger(settings)?,
            open_quotes(settings)?,
            Arc::new(SystemClock),
        ))
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Trade {
            config,
            symbol,
            quantity,
            action,
            price,
        } => run_trade(&config, &symbol, quantity, &action, price),
        Command::Quote {
            config,
            symbol,
            json,
        } => run_quote(&config, &symbol, json),
        Command::Portfolio { config, json } => run_portfolio(&config, json),
        Command::History { config, limit, csv } => run_history(&config, limit, csv),
        Command::Verify { config } => run_verify(&config),
        Command::Serve { config } => run_serve(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_settings(path: &Path) -> Result<Settings, PapertraderError> {
    let config = FileConfigAdapter::from_file(path)?;
    build_settings(&config)
}

pub fn open_ledger(
    settings: &Settings,
) -> Result<Arc<dyn LedgerPort + Send + Sync>, PapertraderError> {
    match &settings.ledger {
        LedgerBackend::Memory => Ok(Arc::new(MemoryLedger::new())),
        LedgerBackend::Json { path } => Ok(Arc::new(JsonLedger::open(path)?)),
        #[cfg(feature = "sqlite")]
        LedgerBackend::Sqlite { path, pool_size } => {
            use crate::adapters::sqlite_ledger::SqliteLedger;
            Ok(Arc::new(SqliteLedger::open(path, *pool_size)?))
        }
        #[cfg(not(feature = "sqlite"))]
        LedgerBackend::Sqlite { .. } => Err(PapertraderError::ConfigInvalid {
            section: "ledger".into(),
            key: "backend".into(),
            reason: "sqlite feature is required for the sqlite backend".into(),
        }),
    }
}

pub fn open_quotes(
    settings: &Settings,
) -> Result<Arc<dyn QuotePort + Send + Sync>, PapertraderError> {
    let inner: Arc<dyn QuotePort + Send + Sync> = match &settings.quotes {
        QuoteSource::Mock { path } => Arc::new(MockQuoteAdapter::from_file(path)?),
        QuoteSource::Csv { path } => Arc::new(CsvQuoteAdapter::from_file(path)?),
    };
    Ok(Arc::new(TimedQuoteAdapter::new(inner, settings.quote_timeout)))
}

fn run_trade(
    config_path: &Path,
    symbol: &str,
    quantity: i64,
    action: &str,
    price: Option<Decimal>,
) -> Result<(), PapertraderError> {
    let settings = load_settings(config_path)?;
    let app = App::from_settings(&settings)?;
    let order = OrderRequest {
        symbol: Some(symbol.to_string()),
        quantity: Some(quantity),
        action: Some(action.to_string()),
        price,
    };
    let trade = app.gateway.submit(order)?;
    eprintln!(
        "{} {} {} @ {}",
        trade.action, trade.quantity, trade.symbol, trade.price
    );
    write_json(&mut io::stdout().lock(), &trade)
}

fn run_quote(config_path: &Path, symbol: &str, json: bool) -> Result<(), PapertraderError> {
    let settings = load_settings(config_path)?;
    let app = App::from_settings(&settings)?;
    let quote = app.gateway.quote(Some(symbol))?;
    let mut out = io::stdout().lock();
    if json {
        write_json(&mut out, &quote)
    } else {
        writeln!(out, "{} {}", quote.symbol, money(quote.price))?;
        Ok(())
    }
}

fn run_portfolio(config_path: &Path, json: bool) -> Result<(), PapertraderError> {
    let settings = load_settings(config_path)?;
    let app = App::from_settings(&settings)?;
    let snapshot = app.portfolio.summary()?;
    let mut out = io::stdout().lock();
    if json {
        write_json(&mut out, &snapshot)
    } else {
        write_snapshot_table(&mut out, &snapshot)
    }
}

fn run_history(config_path: &Path, limit: Option<usize>, csv: bool) -> Result<(), PapertraderError> {
    let settings = load_settings(config_path)?;
    let app = App::from_settings(&settings)?;
    let trades = app.gateway.history(limit)?;
    let mut out = io::stdout().lock();
    if csv {
        write_csv(&mut out, &trades)
    } else {
        write_history_table(&mut out, &trades)
    }
}

fn run_verify(config_path: &Path) -> Result<(), PapertraderError> {
    let settings = load_settings(config_path)?;
    let ledger = open_ledger(&settings)?;
    let trades = ledger.read_all()?;
    let state = reconstruct(settings.starting_cash, &trades)?;
    write_verify_report(&mut io::stdout().lock(), trades.len(), &state)
}

/// Renders a money amount to two places before it is padded.
fn money(value: Decimal) -> String {
    format!("{:.2}", value)
}

/// Pretty-printed JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<(), PapertraderError> {
    serde_json::to_writer_pretty(&mut *out, value)
        .map_err(|e| PapertraderError::Io(io::Error::other(e)))?;
    writeln!(out)?;
    Ok(())
}

pub fn write_snapshot_table<W: Write>(
    out: &mut W,
    snapshot: &PortfolioSnapshot,
) -> Result<(), PapertraderError> {
    writeln!(
        out,
        "{:<8} {:>8} {:>12} {:>12} {:>14} {:>12} {:>8}",
        "SYMBOL", "SHARES", "COST", "PRICE", "VALUE", "P/L", "P/L %"
    )?;
    for h in &snapshot.holdings {
        let price = if h.price_stale {
            format!("{}*", money(h.current_price))
        } else {
            money(h.current_price)
        };
        writeln!(
            out,
            "{:<8} {:>8} {:>12} {:>12} {:>14} {:>12} {:>8}",
            h.symbol,
            h.shares,
            money(h.cost_basis),
            price,
            money(h.current_value),
            money(h.profit_loss),
            h.profit_loss_percent.to_string()
        )?;
    }
    writeln!(out)?;
    writeln!(out, "Cash:         {:>14}", money(snapshot.cash))?;
    writeln!(out, "Assets:       {:>14}", money(snapshot.total_asset_value))?;
    writeln!(out, "Total value:  {:>14}", money(snapshot.total_value))?;
    writeln!(out, "Profit/loss:  {:>14}", money(snapshot.profit_loss))?;
    if !snapshot.stale_symbols.is_empty() {
        writeln!(
            out,
            "* last trade price used for: {}",
            snapshot.stale_symbols.join(", ")
        )?;
    }
    Ok(())
}

pub fn write_history_table<W: Write>(
    out: &mut W,
    trades: &[TradeRecord],
) -> Result<(), PapertraderError> {
    if trades.is_empty() {
        writeln!(out, "No trades recorded")?;
        return Ok(());
    }
    writeln!(
        out,
        "{:<25} {:<8} {:<5} {:>8} {:>12} {:>14}",
        "TIMESTAMP", "SYMBOL", "SIDE", "QTY", "PRICE", "TOTAL"
    )?;
    for t in trades {
        writeln!(
            out,
            "{:<25} {:<8} {:<5} {:>8} {:>12} {:>14}",
            format_timestamp(&t.timestamp),
            t.symbol,
            t.action.as_str(),
            t.quantity,
            t.price.to_string(),
            t.total.to_string()
        )?;
    }
    Ok(())
}

pub fn write_verify_report<W: Write>(
    out: &mut W,
    trades: usize,
    state: &Reconstruction,
) -> Result<(), PapertraderError> {
    writeln!(out, "Trades replayed: {trades}")?;
    writeln!(out, "Cash:            {}", money(state.cash))?;
    writeln!(out, "Open holdings:   {}", state.holdings.len())?;
    if state.warnings.is_empty() {
        writeln!(out, "Ledger is consistent")?;
    } else {
        writeln!(out, "Warnings:        {}", state.warnings.len())?;
        for w in &state.warnings {
            writeln!(out, "  {w}")?;
        }
    }
    Ok(())
}

fn run_serve(config_path: &Path) -> Result<(), PapertraderError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, build_router};
        use std::net::SocketAddr;

        eprintln!("Loading config from {}", config_path.display());
        let settings = load_settings(config_path)?;
        let addr: SocketAddr =
            settings
                .listen
                .parse()
                .map_err(|_| PapertraderError::ConfigInvalid {
                    section: "web".into(),
                    key: "listen".into(),
                    reason: format!("not a socket address: {}", settings.listen),
                })?;
        let app = App::from_settings(&settings)?;

        let router = build_router(AppState {
            portfolio: app.portfolio,
            gateway: app.gateway,
        });

        eprintln!("Starting web server on {}", addr);
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, router).await
        })?;
        Ok(())
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        Err(PapertraderError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: "web feature is required for serve".into(),
        })
    }
}
