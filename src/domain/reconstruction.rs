//! Position reconstruction: replays the ledger into cash and holdings.
//!
//! Replay is a pure fold over the trades in ledger order. The engine never
//! re-sorts; append order is chronological order by contract with the
//! ledger store, and a timestamp that goes backwards is only reported.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use super::error::PapertraderError;
use super::holding::{Holding, Overflow, Reduction};
use super::trade::{Action, TradeRecord};

/// Non-fatal conditions seen during replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayWarning {
    /// A SELL for more shares than held. The holding was removed.
    Oversell {
        index: usize,
        symbol: String,
        held: i64,
        sold: i64,
    },
    /// A SELL for a symbol with no open holding. Only cash was updated.
    UntrackedSell {
        index: usize,
        symbol: String,
        quantity: i64,
    },
    /// A record older than its predecessor. Applied in ledger order.
    TimestampRegression {
        index: usize,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },
}

impl fmt::Display for ReplayWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayWarning::Oversell {
                index,
                symbol,
                held,
                sold,
            } => write!(
                f,
                "trade {index}: sold {sold} {symbol} while holding {held}; position closed"
            ),
            ReplayWarning::UntrackedSell {
                index,
                symbol,
                quantity,
            } => write!(
                f,
                "trade {index}: sold {quantity} {symbol} with no open position"
            ),
            ReplayWarning::TimestampRegression {
                index,
                timestamp,
                previous,
            } => write!(
                f,
                "trade {index}: timestamp {timestamp} precedes {previous}; applied in ledger order"
            ),
        }
    }
}

/// Result of a full replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    pub cash: Decimal,
    pub holdings: BTreeMap<String, Holding>,
    pub warnings: Vec<ReplayWarning>,
}

impl Reconstruction {
    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.get(symbol)
    }

    pub fn shares_of(&self, symbol: &str) -> i64 {
        self.holdings.get(symbol).map_or(0, |h| h.shares)
    }
}

/// Running replay state. Trades are applied one at a time in ledger order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionBook {
    starting_cash: Decimal,
    cash: Decimal,
    holdings: BTreeMap<String, Holding>,
    warnings: Vec<ReplayWarning>,
    applied: usize,
    last_timestamp: Option<DateTime<Utc>>,
}

impl PositionBook {
    pub fn new(starting_cash: Decimal) -> Self {
        PositionBook {
            starting_cash,
            cash: starting_cash,
            holdings: BTreeMap::new(),
            warnings: Vec::new(),
            applied: 0,
            last_timestamp: None,
        }
    }

    pub fn starting_cash(&self) -> Decimal {
        self.starting_cash
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn holdings(&self) -> &BTreeMap<String, Holding> {
        &self.holdings
    }

    pub fn warnings(&self) -> &[ReplayWarning] {
        &self.warnings
    }

    /// Number of ledger records applied so far.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Applies the next ledger record. The record's index is the number of
    /// records already applied.
    ///
    /// A malformed record, or one whose amounts overflow the running totals,
    /// is rejected before any state changes.
    pub fn apply(&mut self, trade: &TradeRecord) -> Result<(), PapertraderError> {
        let index = self.applied;
        let malformed = |reason: String| PapertraderError::MalformedTrade { index, reason };
        trade.validate().map_err(|e| malformed(e.to_string()))?;

        let cash = match trade.action {
            Action::Buy => self.cash.checked_sub(trade.total),
            Action::Sell => self.cash.checked_add(trade.total),
        }
        .ok_or_else(|| malformed(Overflow("cash").to_string()))?;

        debug!(
            index,
            symbol = %trade.symbol,
            action = %trade.action,
            quantity = trade.quantity,
            total = %trade.total,
            "replaying trade"
        );

        let position_warning = match trade.action {
            Action::Buy => self.apply_buy(trade),
            Action::Sell => self.apply_sell(index, trade),
        }
        .map_err(|e| malformed(e.to_string()))?;
        self.cash = cash;

        if let Some(previous) = self.last_timestamp {
            if trade.timestamp < previous {
                self.record(ReplayWarning::TimestampRegression {
                    index,
                    timestamp: trade.timestamp,
                    previous,
                });
            }
        }
        if let Some(warning) = position_warning {
            self.record(warning);
        }

        self.applied += 1;
        self.last_timestamp = Some(
            self.last_timestamp
                .map_or(trade.timestamp, |prev| prev.max(trade.timestamp)),
        );
        Ok(())
    }

    fn record(&mut self, warning: ReplayWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    fn apply_buy(&mut self, trade: &TradeRecord) -> Result<Option<ReplayWarning>, Overflow> {
        match self.holdings.get_mut(&trade.symbol) {
            Some(holding) => holding.add(trade.quantity, trade.total, trade.price)?,
            None => {
                self.holdings.insert(
                    trade.symbol.clone(),
                    Holding::open(&trade.symbol, trade.quantity, trade.total, trade.price),
                );
            }
        }
        Ok(None)
    }

    /// Holdings are untouched if the reduction overflows.
    fn apply_sell(
        &mut self,
        index: usize,
        trade: &TradeRecord,
    ) -> Result<Option<ReplayWarning>, Overflow> {
        let Some(holding) = self.holdings.get_mut(&trade.symbol) else {
            return Ok(Some(ReplayWarning::UntrackedSell {
                index,
                symbol: trade.symbol.clone(),
                quantity: trade.quantity,
            }));
        };

        match holding.reduce(trade.quantity, trade.price)? {
            Reduction::Partial => Ok(None),
            Reduction::Closed => {
                self.holdings.remove(&trade.symbol);
                Ok(None)
            }
            Reduction::Oversold { held } => {
                self.holdings.remove(&trade.symbol);
                Ok(Some(ReplayWarning::Oversell {
                    index,
                    symbol: trade.symbol.clone(),
                    held,
                    sold: trade.quantity,
                }))
            }
        }
    }

    pub fn to_reconstruction(&self) -> Reconstruction {
        Reconstruction {
            cash: self.cash,
            holdings: self.holdings.clone(),
            warnings: self.warnings.clone(),
        }
    }

    pub fn into_reconstruction(self) -> Reconstruction {
        Reconstruction {
            cash: self.cash,
            holdings: self.holdings,
            warnings: self.warnings,
        }
    }
}

/// Replays `trades` from `starting_cash`. Fails as a whole on the first
/// malformed record; there are no partial portfolios.
pub fn reconstruct(
    starting_cash: Decimal,
    trades: &[TradeRecord],
) -> Result<Reconstruction, PapertraderError> {
    let mut book = PositionBook::new(starting_cash);
    for trade in trades {
        book.apply(trade)?;
    }
    Ok(book.into_reconstruction())
}
