#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use papertrader::domain::error::PriceUnavailable;
use papertrader::domain::trade::{Action, TradeRecord};
use papertrader::ports::clock_port::Clock;
use papertrader::ports::quote_port::QuotePort;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct MockQuotePort {
    pub prices: Mutex<HashMap<String, Decimal>>,
    pub down: Mutex<Vec<String>>,
}

impl MockQuotePort {
    pub fn new() -> Self {
        Self {
            prices: Mutex::new(HashMap::new()),
            down: Mutex::new(Vec::new()),
        }
    }

    pub fn with_price(self, symbol: &str, price: Decimal) -> Self {
        self.set_price(symbol, price);
        self
    }

    pub fn with_outage(self, symbol: &str) -> Self {
        self.down.lock().unwrap().push(symbol.to_string());
        self
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices
            .lock()
            .unwrap()
            .insert(symbol.to_string(), price);
    }
}

impl QuotePort for MockQuotePort {
    fn quote(&self, symbol: &str) -> Result<Decimal, PriceUnavailable> {
        if self.down.lock().unwrap().iter().any(|s| s == symbol) {
            return Err(PriceUnavailable::Unavailable {
                symbol: symbol.to_string(),
                reason: "source offline".into(),
            });
        }
        self.prices
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| PriceUnavailable::NotFound {
                symbol: symbol.to_string(),
            })
    }
}

/// A clock that advances one second on every read.
pub struct SteppingClock {
    next: Mutex<DateTime<Utc>>,
}

impl SteppingClock {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            next: Mutex::new(start),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().unwrap();
        let now = *next;
        *next = now + Duration::seconds(1);
        now
    }
}

pub fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}

pub fn buy(symbol: &str, quantity: i64, price: Decimal, at: DateTime<Utc>) -> TradeRecord {
    TradeRecord::new(symbol, quantity, Action::Buy, price, at)
}

pub fn sell(symbol: &str, quantity: i64, price: Decimal, at: DateTime<Utc>) -> TradeRecord {
    TradeRecord::new(symbol, quantity, Action::Sell, price, at)
}
