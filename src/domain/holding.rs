//! Derived per-symbol position state.

use rust_decimal::Decimal;
use serde::Serialize;

/// A position rebuilt from the ledger. Never stored.
///
/// Invariant: `shares > 0` for every holding that is kept in a book;
/// a holding whose last share is sold is removed, not retained at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Holding {
    pub symbol: String,
    pub shares: i64,
    /// Aggregate cost of the shares currently held.
    pub cost_basis: Decimal,
    /// Execution price of the most recent trade in this symbol.
    pub last_trade_price: Decimal,
}

/// Outcome of removing shares from a holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Partial,
    Closed,
    /// More shares were sold than held; the position is closed.
    Oversold { held: i64 },
}

/// A share count or money amount left its numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} overflows")]
pub struct Overflow(pub &'static str);

impl Holding {
    pub fn open(symbol: impl Into<String>, shares: i64, cost: Decimal, price: Decimal) -> Self {
        Holding {
            symbol: symbol.into(),
            shares,
            cost_basis: cost,
            last_trade_price: price,
        }
    }

    /// Weighted-average cost of one share; zero for an empty holding.
    pub fn per_share_cost(&self) -> Decimal {
        if self.shares <= 0 {
            return Decimal::ZERO;
        }
        self.cost_basis / Decimal::from(self.shares)
    }

    pub fn market_value(&self, price: Decimal) -> Decimal {
        price * Decimal::from(self.shares)
    }

    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        self.market_value(price) - self.cost_basis
    }

    /// Adds a purchase lot into the moving weighted average. On overflow
    /// the holding is left unchanged.
    pub fn add(&mut self, quantity: i64, total: Decimal, price: Decimal) -> Result<(), Overflow> {
        let shares = self
            .shares
            .checked_add(quantity)
            .ok_or(Overflow("share count"))?;
        let cost_basis = self
            .cost_basis
            .checked_add(total)
            .ok_or(Overflow("cost basis"))?;
        self.shares = shares;
        self.cost_basis = cost_basis;
        self.last_trade_price = price;
        Ok(())
    }

    /// Removes `quantity` shares, shrinking cost basis in proportion to the
    /// pre-sale share count. The sale price does not affect remaining cost.
    pub fn reduce(&mut self, quantity: i64, price: Decimal) -> Result<Reduction, Overflow> {
        let held = self.shares;
        if quantity >= held {
            self.shares = 0;
            self.cost_basis = Decimal::ZERO;
            self.last_trade_price = price;
            return Ok(if quantity > held {
                Reduction::Oversold { held }
            } else {
                Reduction::Closed
            });
        }
        let released = self
            .cost_basis
            .checked_mul(Decimal::from(quantity))
            .and_then(|scaled| scaled.checked_div(Decimal::from(held)))
            .ok_or(Overflow("cost basis"))?;
        self.cost_basis -= released;
        self.shares -= quantity;
        self.last_trade_price = price;
        Ok(Reduction::Partial)
    }
}
