//! Canned quote source backed by a JSON file of "Global Quote" payloads.
//!
//! ```json
//! { "AAPL": { "Global Quote": { "05. price": "189.84" } } }
//! ```

use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::domain::error::{PapertraderError, PriceUnavailable};
use crate::ports::quote_port::QuotePort;

const QUOTE_KEY: &str = "Global Quote";
const PRICE_KEY: &str = "05. price";

pub struct MockQuoteAdapter {
    payloads: HashMap<String, Value>,
}

impl MockQuoteAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PapertraderError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PapertraderError::QuoteSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, PapertraderError> {
        let root: Value = serde_json::from_str(content).map_err(|e| {
            PapertraderError::QuoteSource {
                reason: format!("invalid quote payload: {e}"),
            }
        })?;
        let Value::Object(map) = root else {
            return Err(PapertraderError::QuoteSource {
                reason: "quote payload must be an object keyed by symbol".into(),
            });
        };
        let payloads = map
            .into_iter()
            .map(|(symbol, payload)| (symbol.to_ascii_uppercase(), payload))
            .collect();
        Ok(Self { payloads })
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<_> = self.payloads.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}

fn extract_price(symbol: &str, payload: &Value) -> Result<Decimal, PriceUnavailable> {
    let unavailable = |reason: &str| PriceUnavailable::Unavailable {
        symbol: symbol.to_string(),
        reason: reason.to_string(),
    };
    let raw = payload
        .get(QUOTE_KEY)
        .and_then(|q| q.get(PRICE_KEY))
        .ok_or_else(|| unavailable("payload has no price"))?;
    let price = match raw {
        Value::String(s) => Decimal::from_str(s.trim()).map_err(|_| unavailable("price is not a number"))?,
        Value::Number(n) => {
            Decimal::from_str(&n.to_string()).map_err(|_| unavailable("price is not a number"))?
        }
        _ => return Err(unavailable("price is not a number")),
    };
    if price <= Decimal::ZERO {
        return Err(unavailable("price is not positive"));
    }
    Ok(price)
}

impl QuotePort for MockQuoteAdapter {
    fn quote(&self, symbol: &str) -> Result<Decimal, PriceUnavailable> {
        let payload = self
            .payloads
            .get(&symbol.to_ascii_uppercase())
            .ok_or_else(|| PriceUnavailable::NotFound {
                symbol: symbol.to_string(),
            })?;
        extract_price(symbol, payload)
    }
}
