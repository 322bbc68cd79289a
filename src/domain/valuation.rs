//! Valuation of reconstructed holdings against live quotes.
//!
//! A failed quote never fails the snapshot. The holding is valued at its
//! last trade price, flagged `price_stale`, and listed in `stale_symbols`.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use super::holding::Holding;
use crate::ports::quote_port::QuotePort;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingValuation {
    pub symbol: String,
    pub shares: i64,
    pub cost_basis: Decimal,
    pub per_share_cost: Decimal,
    pub current_price: Decimal,
    pub current_value: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_percent: Decimal,
    pub price_stale: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub cash: Decimal,
    pub total_asset_value: Decimal,
    pub total_value: Decimal,
    pub profit_loss: Decimal,
    pub holdings: Vec<HoldingValuation>,
    pub stale_symbols: Vec<String>,
}

impl PortfolioSnapshot {
    pub fn holding(&self, symbol: &str) -> Option<&HoldingValuation> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    pub fn is_fully_priced(&self) -> bool {
        self.stale_symbols.is_empty()
    }
}

fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part / whole * Decimal::ONE_HUNDRED).round_dp(2)
}

pub fn value_holding(holding: &Holding, quotes: &dyn QuotePort) -> HoldingValuation {
    let (current_price, price_stale) = match quotes.quote(&holding.symbol) {
        Ok(price) => (price, false),
        Err(e) => {
            warn!(
                symbol = %holding.symbol,
                fallback = %holding.last_trade_price,
                "{e}; valuing at last trade price"
            );
            (holding.last_trade_price, true)
        }
    };

    let current_value = holding.market_value(current_price);
    let profit_loss = current_value - holding.cost_basis;
    HoldingValuation {
        symbol: holding.symbol.clone(),
        shares: holding.shares,
        cost_basis: holding.cost_basis,
        per_share_cost: holding.per_share_cost(),
        current_price,
        current_value,
        profit_loss,
        profit_loss_percent: percent_of(profit_loss, holding.cost_basis),
        price_stale,
    }
}

/// Values every holding and aggregates the totals.
pub fn valuate(
    cash: Decimal,
    holdings: &BTreeMap<String, Holding>,
    quotes: &dyn QuotePort,
) -> PortfolioSnapshot {
    let valued: Vec<HoldingValuation> = holdings
        .values()
        .map(|holding| value_holding(holding, quotes))
        .collect();

    let total_asset_value: Decimal = valued.iter().map(|h| h.current_value).sum();
    let profit_loss: Decimal = valued.iter().map(|h| h.profit_loss).sum();
    let stale_symbols = valued
        .iter()
        .filter(|h| h.price_stale)
        .map(|h| h.symbol.clone())
        .collect();

    PortfolioSnapshot {
        cash,
        total_asset_value,
        total_value: cash + total_asset_value,
        profit_loss,
        holdings: valued,
        stale_symbols,
    }
}
