//! Price oracle port trait.

use crate::domain::error::PriceUnavailable;
use rust_decimal::Decimal;

pub trait QuotePort {
    /// Current price per share of `symbol`.
    fn quote(&self, symbol: &str) -> Result<Decimal, PriceUnavailable>;
}
