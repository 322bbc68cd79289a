//! Domain error types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Rejection of an order or record before it enters the ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid symbol {symbol:?}")]
    InvalidSymbol { symbol: String },

    #[error("invalid action {action:?} (expected BUY or SELL)")]
    InvalidAction { action: String },

    #[error("quantity must be positive, got {quantity}")]
    NonPositiveQuantity { quantity: i64 },

    #[error("price must be positive, got {price}")]
    NonPositivePrice { price: Decimal },

    #[error("total {total} does not match price {price} x quantity {quantity}")]
    TotalMismatch {
        total: Decimal,
        price: Decimal,
        quantity: i64,
    },

    #[error("order value {price} x {quantity} is out of range")]
    ValueOutOfRange { price: Decimal, quantity: i64 },

    #[error("timestamp {timestamp} precedes last ledger timestamp {last}")]
    TimestampRegression {
        timestamp: DateTime<Utc>,
        last: DateTime<Utc>,
    },

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("insufficient shares of {symbol}: need {needed}, have {available}")]
    InsufficientShares {
        symbol: String,
        needed: i64,
        available: i64,
    },
}

/// Why a live quote could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceUnavailable {
    #[error("symbol {symbol} not found")]
    NotFound { symbol: String },

    #[error("quote for {symbol} unavailable: {reason}")]
    Unavailable { symbol: String, reason: String },
}

impl PriceUnavailable {
    pub fn symbol(&self) -> &str {
        match self {
            PriceUnavailable::NotFound { symbol } | PriceUnavailable::Unavailable { symbol, .. } => {
                symbol
            }
        }
    }
}

/// Top-level error type for papertrader.
#[derive(Debug, thiserror::Error)]
pub enum PapertraderError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("ledger error: {reason}")]
    Ledger { reason: String },

    #[error("malformed trade at ledger index {index}: {reason}")]
    MalformedTrade { index: usize, reason: String },

    #[error("quote source error: {reason}")]
    QuoteSource { reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    PriceUnavailable(#[from] PriceUnavailable),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PapertraderError {
    /// Process exit status for this error class.
    pub fn exit_status(&self) -> u8 {
        match self {
            PapertraderError::Io(_) => 1,
            PapertraderError::ConfigParse { .. }
            | PapertraderError::ConfigMissing { .. }
            | PapertraderError::ConfigInvalid { .. } => 2,
            PapertraderError::Database { .. }
            | PapertraderError::DatabaseQuery { .. }
            | PapertraderError::Ledger { .. } => 3,
            PapertraderError::MalformedTrade { .. } => 4,
            PapertraderError::Validation(_) => 5,
            PapertraderError::PriceUnavailable(_) | PapertraderError::QuoteSource { .. } => 6,
        }
    }
}

impl From<&PapertraderError> for std::process::ExitCode {
    fn from(err: &PapertraderError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
