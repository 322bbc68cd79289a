//! Portfolio summary: ledger read, replay, valuation.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use super::checkpoint::ReplayCache;
use super::error::PapertraderError;
use super::reconstruction::Reconstruction;
use super::valuation::{PortfolioSnapshot, valuate};
use crate::ports::ledger_port::LedgerPort;
use crate::ports::quote_port::QuotePort;

pub struct PortfolioService {
    ledger: Arc<dyn LedgerPort + Send + Sync>,
    quotes: Arc<dyn QuotePort + Send + Sync>,
    cache: ReplayCache,
}

impl PortfolioService {
    pub fn new(
        ledger: Arc<dyn LedgerPort + Send + Sync>,
        quotes: Arc<dyn QuotePort + Send + Sync>,
        starting_cash: Decimal,
    ) -> Self {
        PortfolioService {
            ledger,
            quotes,
            cache: ReplayCache::new(starting_cash),
        }
    }

    pub fn starting_cash(&self) -> Decimal {
        self.cache.starting_cash()
    }

    /// Current cash and holdings, replayed from a snapshot read of the ledger.
    pub fn reconstruct(&self) -> Result<Reconstruction, PapertraderError> {
        let trades = self.ledger.read_all()?;
        debug!(trades = trades.len(), "reconstructing portfolio");
        self.cache.replay(&trades)
    }

    /// Full valued snapshot. Fails only if the ledger cannot be read or
    /// replayed; stale quotes degrade individual holdings.
    pub fn summary(&self) -> Result<PortfolioSnapshot, PapertraderError> {
        let state = self.reconstruct()?;
        Ok(valuate(state.cash, &state.holdings, self.quotes.as_ref()))
    }
}
