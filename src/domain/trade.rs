//! Trade records: the unit of the append-only ledger.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ValidationError;

/// Largest tolerated difference between `total` and `price * quantity`.
pub const TOTAL_EPSILON: Decimal = dec!(0.000001);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Action::Buy),
            "SELL" => Ok(Action::Sell),
            _ => Err(ValidationError::InvalidAction {
                action: s.to_string(),
            }),
        }
    }
}

/// One executed order. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub quantity: i64,
    pub action: Action,
    pub price: Decimal,
    pub total: Decimal,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl TradeRecord {
    /// Builds a record whose `total` is exactly `price * quantity`.
    pub fn new(
        symbol: impl Into<String>,
        quantity: i64,
        action: Action,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        TradeRecord {
            symbol: symbol.into(),
            quantity,
            action,
            price,
            total: price * Decimal::from(quantity),
            timestamp,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.action == Action::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.action == Action::Sell
    }

    /// Structural and arithmetic checks shared by ledger appends and replay.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !is_valid_symbol(&self.symbol) {
            return Err(ValidationError::InvalidSymbol {
                symbol: self.symbol.clone(),
            });
        }
        if self.quantity <= 0 {
            return Err(ValidationError::NonPositiveQuantity {
                quantity: self.quantity,
            });
        }
        if self.price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice { price: self.price });
        }
        let mismatch = || ValidationError::TotalMismatch {
            total: self.total,
            price: self.price,
            quantity: self.quantity,
        };
        let expected = self
            .price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or_else(mismatch)?;
        let diff = self.total.checked_sub(expected).ok_or_else(mismatch)?;
        if diff.abs() > TOTAL_EPSILON {
            return Err(mismatch());
        }
        Ok(())
    }
}

/// Ticker symbols are non-empty runs of uppercase ASCII letters, digits, `.` or `-`.
pub fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-')
}

/// Checks a record against the last stored one before it is appended.
///
/// Every ledger backend calls this under its writer lock so that append
/// order stays chronological.
pub fn check_append(
    last: Option<&TradeRecord>,
    record: &TradeRecord,
) -> Result<(), ValidationError> {
    record.validate()?;
    if let Some(last) = last {
        if record.timestamp < last.timestamp {
            return Err(ValidationError::TimestampRegression {
                timestamp: record.timestamp,
                last: last.timestamp,
            });
        }
    }
    Ok(())
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parses RFC 3339, falling back to an offset-less ISO-8601 form read as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Serde adapter for ledger timestamps.
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp {raw:?}")))
    }
}
