//! Application settings, validated from a [`ConfigPort`].

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::error::PapertraderError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_STARTING_CASH: Decimal = dec!(10000);
pub const DEFAULT_QUOTE_TIMEOUT_MS: i64 = 2000;
pub const DEFAULT_SQLITE_POOL_SIZE: i64 = 4;
pub const DEFAULT_LISTEN: &str = "127.0.0.1:9004";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerBackend {
    Memory,
    Json { path: PathBuf },
    Sqlite { path: PathBuf, pool_size: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteSource {
    Mock { path: PathBuf },
    Csv { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub starting_cash: Decimal,
    pub ledger: LedgerBackend,
    pub quotes: QuoteSource,
    pub quote_timeout: Duration,
    pub enforce_buying_power: bool,
    pub listen: String,
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> PapertraderError {
    PapertraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn required_path(config: &dyn ConfigPort, section: &str) -> Result<PathBuf, PapertraderError> {
    match config.get_string(section, "path") {
        Some(p) if !p.trim().is_empty() => Ok(PathBuf::from(p.trim())),
        _ => Err(PapertraderError::ConfigMissing {
            section: section.to_string(),
            key: "path".to_string(),
        }),
    }
}

fn positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, PapertraderError> {
    let value = config.get_int(section, key, default);
    if value <= 0 {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    Ok(value)
}

fn build_starting_cash(config: &dyn ConfigPort) -> Result<Decimal, PapertraderError> {
    let Some(raw) = config.get_string("portfolio", "starting_cash") else {
        return Ok(DEFAULT_STARTING_CASH);
    };
    let cash = Decimal::from_str(raw.trim())
        .map_err(|_| invalid("portfolio", "starting_cash", "not a decimal number"))?;
    if cash <= Decimal::ZERO {
        return Err(invalid(
            "portfolio",
            "starting_cash",
            "starting_cash must be positive",
        ));
    }
    Ok(cash)
}

fn build_ledger(config: &dyn ConfigPort) -> Result<LedgerBackend, PapertraderError> {
    let backend = config
        .get_string("ledger", "backend")
        .unwrap_or_else(|| "json".to_string());
    match backend.trim().to_ascii_lowercase().as_str() {
        "memory" => Ok(LedgerBackend::Memory),
        "json" => Ok(LedgerBackend::Json {
            path: required_path(config, "ledger")?,
        }),
        "sqlite" => {
            let path = required_path(config, "ledger")?;
            let pool_size = positive_int(config, "ledger", "pool_size", DEFAULT_SQLITE_POOL_SIZE)?;
            let pool_size = u32::try_from(pool_size)
                .map_err(|_| invalid("ledger", "pool_size", "pool_size is too large"))?;
            Ok(LedgerBackend::Sqlite { path, pool_size })
        }
        other => Err(invalid(
            "ledger",
            "backend",
            format!("unknown backend {other:?} (expected json, sqlite or memory)"),
        )),
    }
}

fn build_quotes(config: &dyn ConfigPort) -> Result<QuoteSource, PapertraderError> {
    let source = config
        .get_string("quotes", "source")
        .unwrap_or_else(|| "mock".to_string());
    match source.trim().to_ascii_lowercase().as_str() {
        "mock" => Ok(QuoteSource::Mock {
            path: required_path(config, "quotes")?,
        }),
        "csv" => Ok(QuoteSource::Csv {
            path: required_path(config, "quotes")?,
        }),
        other => Err(invalid(
            "quotes",
            "source",
            format!("unknown source {other:?} (expected mock or csv)"),
        )),
    }
}

pub fn build_settings(config: &dyn ConfigPort) -> Result<Settings, PapertraderError> {
    let timeout_ms = positive_int(config, "quotes", "timeout_ms", DEFAULT_QUOTE_TIMEOUT_MS)?;
    Ok(Settings {
        starting_cash: build_starting_cash(config)?,
        ledger: build_ledger(config)?,
        quotes: build_quotes(config)?,
        quote_timeout: Duration::from_millis(timeout_ms as u64),
        enforce_buying_power: config.get_bool("gateway", "enforce_buying_power", true),
        listen: config
            .get_string("web", "listen")
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string()),
    })
}
