//! Trade execution gateway: validates orders, prices them, appends to the ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::info;

use super::error::{PapertraderError, ValidationError};
use super::reconstruction::reconstruct;
use super::trade::{Action, TradeRecord, is_valid_symbol};
use crate::ports::clock_port::Clock;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::quote_port::QuotePort;

/// An order as submitted by a caller. Every field is optional so that a
/// missing one can be reported by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OrderRequest {
    pub symbol: Option<String>,
    pub quantity: Option<i64>,
    pub action: Option<String>,
    pub price: Option<Decimal>,
}

impl OrderRequest {
    pub fn new(symbol: &str, quantity: i64, action: Action) -> Self {
        OrderRequest {
            symbol: Some(symbol.to_string()),
            quantity: Some(quantity),
            action: Some(action.to_string()),
            price: None,
        }
    }

    pub fn at_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub symbol: String,
    pub quantity: i64,
    pub action: Action,
    pub price: Option<Decimal>,
}

/// A live price for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
}

/// Trims and uppercases a caller-supplied symbol.
pub fn normalize_symbol(symbol: Option<&str>) -> Result<String, ValidationError> {
    let symbol = symbol
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::MissingField { field: "symbol" })?
        .to_ascii_uppercase();
    if !is_valid_symbol(&symbol) {
        return Err(ValidationError::InvalidSymbol { symbol });
    }
    Ok(symbol)
}

/// Structural checks on an incoming order. Symbols are uppercased.
pub fn validate_order(order: &OrderRequest) -> Result<ValidatedOrder, ValidationError> {
    let symbol = normalize_symbol(order.symbol.as_deref())?;

    let quantity = order
        .quantity
        .ok_or(ValidationError::MissingField { field: "quantity" })?;
    if quantity <= 0 {
        return Err(ValidationError::NonPositiveQuantity { quantity });
    }

    let action: Action = order
        .action
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or(ValidationError::MissingField { field: "action" })?
        .parse()?;

    if let Some(price) = order.price {
        if price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice { price });
        }
    }

    Ok(ValidatedOrder {
        symbol,
        quantity,
        action,
        price: order.price,
    })
}

pub struct TradeGateway {
    ledger: Arc<dyn LedgerPort + Send + Sync>,
    quotes: Arc<dyn QuotePort + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    starting_cash: Decimal,
    enforce_buying_power: bool,
    submit_lock: Mutex<()>,
}

impl TradeGateway {
    pub fn new(
        ledger: Arc<dyn LedgerPort + Send + Sync>,
        quotes: Arc<dyn QuotePort + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        starting_cash: Decimal,
    ) -> Self {
        TradeGateway {
            ledger,
            quotes,
            clock,
            starting_cash,
            enforce_buying_power: true,
            submit_lock: Mutex::new(()),
        }
    }

    /// Enables or disables the cash and share checks made before appending.
    pub fn with_buying_power_check(mut self, enabled: bool) -> Self {
        self.enforce_buying_power = enabled;
        self
    }

    /// Validates, prices, and appends an order. Returns the stored record.
    pub fn submit(&self, order: OrderRequest) -> Result<TradeRecord, PapertraderError> {
        let order = validate_order(&order)?;
        let price = match order.price {
            Some(price) => price,
            None => self.quotes.quote(&order.symbol)?,
        };

        let _guard = self
            .submit_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let trades = self.ledger.read_all()?;
        let now = self.clock.now();
        let timestamp = trades.last().map_or(now, |last| now.max(last.timestamp));
        price
            .checked_mul(Decimal::from(order.quantity))
            .ok_or(ValidationError::ValueOutOfRange {
                price,
                quantity: order.quantity,
            })?;
        let record = TradeRecord::new(order.symbol, order.quantity, order.action, price, timestamp);

        if self.enforce_buying_power {
            self.check_buying_power(&trades, &record)?;
        }

        self.ledger.append(&record)?;
        info!(
            symbol = %record.symbol,
            action = %record.action,
            quantity = record.quantity,
            price = %record.price,
            total = %record.total,
            "trade executed"
        );
        Ok(record)
    }

    fn check_buying_power(
        &self,
        trades: &[TradeRecord],
        record: &TradeRecord,
    ) -> Result<(), PapertraderError> {
        let state = reconstruct(self.starting_cash, trades)?;
        match record.action {
            Action::Buy if record.total > state.cash => Err(ValidationError::InsufficientFunds {
                needed: record.total,
                available: state.cash,
            }
            .into()),
            Action::Sell if record.quantity > state.shares_of(&record.symbol) => {
                Err(ValidationError::InsufficientShares {
                    symbol: record.symbol.clone(),
                    needed: record.quantity,
                    available: state.shares_of(&record.symbol),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    /// Looks up the current price the gateway would execute at.
    pub fn quote(&self, symbol: Option<&str>) -> Result<Quote, PapertraderError> {
        let symbol = normalize_symbol(symbol)?;
        let price = self.quotes.quote(&symbol)?;
        Ok(Quote { symbol, price })
    }

    /// Most recent trades first, at most `limit` of them.
    pub fn history(&self, limit: Option<usize>) -> Result<Vec<TradeRecord>, PapertraderError> {
        let trades = self.ledger.read_all()?;
        let limit = limit.unwrap_or(trades.len());
        Ok(trades.into_iter().rev().take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_ledger::MemoryLedger;
    use crate::domain::error::PriceUnavailable;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;

    struct StubQuotes;

    impl QuotePort for StubQuotes {
        fn quote(&self, symbol: &str) -> Result<Decimal, PriceUnavailable> {
            match symbol {
                "AAPL" => Ok(dec!(10)),
                "MSFT" => Ok(dec!(400)),
                "DOWN" => Err(PriceUnavailable::Unavailable {
                    symbol: symbol.into(),
                    reason: "upstream timeout".into(),
                }),
                _ => Err(PriceUnavailable::NotFound {
                    symbol: symbol.into(),
                }),
            }
        }
    }

    struct StoppedClock(DateTime<Utc>);

    impl Clock for StoppedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap()
    }

    fn gateway(ledger: Arc<MemoryLedger>, cash: Decimal) -> TradeGateway {
        TradeGateway::new(ledger, Arc::new(StubQuotes), Arc::new(StoppedClock(noon())), cash)
    }

    #[test]
    fn validate_order_reports_missing_fields() {
        let mut order = OrderRequest::new("AAPL", 1, Action::Buy);
        order.symbol = Some("  ".into());
        assert_eq!(
            validate_order(&order),
            Err(ValidationError::MissingField { field: "symbol" })
        );

        let mut order = OrderRequest::new("AAPL", 1, Action::Buy);
        order.quantity = None;
        assert_eq!(
            validate_order(&order),
            Err(ValidationError::MissingField { field: "quantity" })
        );

        let mut order = OrderRequest::new("AAPL", 1, Action::Buy);
        order.action = None;
        assert_eq!(
            validate_order(&order),
            Err(ValidationError::MissingField { field: "action" })
        );
    }

    #[test]
    fn validate_order_normalizes_symbol_and_action() {
        let order = OrderRequest {
            symbol: Some(" aapl ".into()),
            quantity: Some(3),
            action: Some("sell".into()),
            price: None,
        };
        let validated = validate_order(&order).unwrap();
        assert_eq!(validated.symbol, "AAPL");
        assert_eq!(validated.action, Action::Sell);
    }

    #[test]
    fn validate_order_rejects_bad_values() {
        let zero = OrderRequest::new("AAPL", 0, Action::Buy);
        assert_eq!(
            validate_order(&zero),
            Err(ValidationError::NonPositiveQuantity { quantity: 0 })
        );

        let mut hold = OrderRequest::new("AAPL", 1, Action::Buy);
        hold.action = Some("HOLD".into());
        assert!(matches!(
            validate_order(&hold),
            Err(ValidationError::InvalidAction { .. })
        ));

        let free = OrderRequest::new("AAPL", 1, Action::Buy).at_price(dec!(0));
        assert!(matches!(
            validate_order(&free),
            Err(ValidationError::NonPositivePrice { .. })
        ));
    }

    #[test]
    fn submit_quotes_and_appends() {
        let ledger = Arc::new(MemoryLedger::new());
        let gw = gateway(ledger.clone(), dec!(10000));
        let record = gw.submit(OrderRequest::new("aapl", 10, Action::Buy)).unwrap();
        assert_eq!(record.symbol, "AAPL");
        assert_eq!(record.price, dec!(10));
        assert_eq!(record.total, dec!(100));
        assert_eq!(record.timestamp, noon());
        assert_eq!(ledger.read_all().unwrap(), vec![record]);
    }

    #[test]
    fn submit_uses_supplied_price() {
        let ledger = Arc::new(MemoryLedger::new());
        let gw = gateway(ledger, dec!(10000));
        let record = gw
            .submit(OrderRequest::new("AAPL", 2, Action::Buy).at_price(dec!(9.5)))
            .unwrap();
        assert_eq!(record.total, dec!(19.0));
    }

    #[test]
    fn submit_maps_unknown_symbol_to_price_error() {
        let gw = gateway(Arc::new(MemoryLedger::new()), dec!(10000));
        assert!(matches!(
            gw.submit(OrderRequest::new("ZZZZ", 1, Action::Buy)),
            Err(PapertraderError::PriceUnavailable(PriceUnavailable::NotFound { .. }))
        ));
        assert!(matches!(
            gw.submit(OrderRequest::new("DOWN", 1, Action::Buy)),
            Err(PapertraderError::PriceUnavailable(PriceUnavailable::Unavailable { .. }))
        ));
    }

    #[test]
    fn submit_rejects_insufficient_funds() {
        let ledger = Arc::new(MemoryLedger::new());
        let gw = gateway(ledger.clone(), dec!(500));
        let err = gw.submit(OrderRequest::new("MSFT", 2, Action::Buy)).unwrap_err();
        assert!(matches!(
            err,
            PapertraderError::Validation(ValidationError::InsufficientFunds { .. })
        ));
        assert!(ledger.is_empty().unwrap());
    }

    #[test]
    fn submit_rejects_selling_more_than_held() {
        let ledger = Arc::new(MemoryLedger::new());
        let gw = gateway(ledger.clone(), dec!(10000));
        gw.submit(OrderRequest::new("AAPL", 5, Action::Buy)).unwrap();
        let err = gw.submit(OrderRequest::new("AAPL", 6, Action::Sell)).unwrap_err();
        assert!(matches!(
            err,
            PapertraderError::Validation(ValidationError::InsufficientShares {
                needed: 6,
                available: 5,
                ..
            })
        ));
        assert_eq!(ledger.len().unwrap(), 1);
    }

    #[test]
    fn submit_rejects_order_value_out_of_range() {
        let ledger = Arc::new(MemoryLedger::new());
        let gw = gateway(ledger.clone(), dec!(10000)).with_buying_power_check(false);
        let err = gw
            .submit(OrderRequest::new("AAPL", i64::MAX, Action::Buy).at_price(Decimal::MAX))
            .unwrap_err();
        assert!(matches!(
            err,
            PapertraderError::Validation(ValidationError::ValueOutOfRange { .. })
        ));
        assert!(ledger.is_empty().unwrap());
    }

    #[test]
    fn buying_power_check_can_be_disabled() {
        let ledger = Arc::new(MemoryLedger::new());
        let gw = gateway(ledger.clone(), dec!(10)).with_buying_power_check(false);
        gw.submit(OrderRequest::new("MSFT", 1, Action::Buy)).unwrap();
        gw.submit(OrderRequest::new("AAPL", 3, Action::Sell)).unwrap();
        assert_eq!(ledger.len().unwrap(), 2);
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let later = TradeRecord::new(
            "AAPL",
            1,
            Action::Buy,
            dec!(10),
            Utc.with_ymd_and_hms(2024, 6, 3, 13, 0, 0).unwrap(),
        );
        let ledger = Arc::new(MemoryLedger::from_records(vec![later.clone()]));
        let gw = gateway(ledger, dec!(10000));
        let record = gw.submit(OrderRequest::new("AAPL", 1, Action::Buy)).unwrap();
        assert_eq!(record.timestamp, later.timestamp);
    }

    #[test]
    fn quote_normalizes_symbol_and_maps_errors() {
        let gw = gateway(Arc::new(MemoryLedger::new()), dec!(10000));
        assert_eq!(
            gw.quote(Some(" msft ")).unwrap(),
            Quote {
                symbol: "MSFT".into(),
                price: dec!(400),
            }
        );
        assert!(matches!(
            gw.quote(None),
            Err(PapertraderError::Validation(ValidationError::MissingField { field: "symbol" }))
        ));
        assert!(matches!(
            gw.quote(Some("ZZZZ")),
            Err(PapertraderError::PriceUnavailable(PriceUnavailable::NotFound { .. }))
        ));
        assert!(matches!(
            gw.quote(Some("DOWN")),
            Err(PapertraderError::PriceUnavailable(PriceUnavailable::Unavailable { .. }))
        ));
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let ledger = Arc::new(MemoryLedger::new());
        let gw = gateway(ledger, dec!(10000));
        gw.submit(OrderRequest::new("AAPL", 1, Action::Buy)).unwrap();
        gw.submit(OrderRequest::new("MSFT", 1, Action::Buy)).unwrap();
        gw.submit(OrderRequest::new("AAPL", 1, Action::Sell)).unwrap();

        let recent = gw.history(Some(2)).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, Action::Sell);
        assert_eq!(recent[1].symbol, "MSFT");
        assert_eq!(gw.history(None).unwrap().len(), 3);
    }
}
