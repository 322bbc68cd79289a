//! Incremental replay from a cached checkpoint.
//!
//! The ledger is append-only, so a book built from its first `n` records
//! stays valid as long as those records are unchanged. A checkpoint keeps
//! the book plus a copy of those `n` records; a later replay whose ledger
//! starts with the same records only applies the suffix.

use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use super::error::PapertraderError;
use super::reconstruction::{PositionBook, Reconstruction};
use super::trade::TradeRecord;

#[derive(Debug, Clone)]
pub struct Checkpoint {
    book: PositionBook,
    prefix: Vec<TradeRecord>,
}

impl Checkpoint {
    pub fn applied(&self) -> usize {
        self.book.applied()
    }

    /// Whether `trades` still extends the prefix this checkpoint was built from.
    pub fn matches(&self, trades: &[TradeRecord]) -> bool {
        trades.get(..self.prefix.len()) == Some(self.prefix.as_slice())
    }
}

/// Replays a ledger, reusing the previous replay when the ledger only grew.
///
/// The lock is only held to read or swap the checkpoint, so concurrent
/// replays run in parallel.
#[derive(Debug)]
pub struct ReplayCache {
    starting_cash: Decimal,
    checkpoint: Mutex<Option<Arc<Checkpoint>>>,
}

impl ReplayCache {
    pub fn new(starting_cash: Decimal) -> Self {
        ReplayCache {
            starting_cash,
            checkpoint: Mutex::new(None),
        }
    }

    pub fn starting_cash(&self) -> Decimal {
        self.starting_cash
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<Checkpoint>>> {
        self.checkpoint
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Produces the same result as `reconstruct(starting_cash, trades)`.
    ///
    /// A failed replay leaves the stored checkpoint as it was.
    pub fn replay(&self, trades: &[TradeRecord]) -> Result<Reconstruction, PapertraderError> {
        let cached = self.slot().clone();

        let mut book = match cached.as_deref() {
            Some(cp) if cp.matches(trades) => {
                debug!(
                    applied = cp.applied(),
                    pending = trades.len() - cp.applied(),
                    "resuming replay from checkpoint"
                );
                cp.book.clone()
            }
            Some(cp) => {
                warn!(
                    applied = cp.applied(),
                    ledger_len = trades.len(),
                    "ledger no longer matches checkpoint; replaying from start"
                );
                PositionBook::new(self.starting_cash)
            }
            None => PositionBook::new(self.starting_cash),
        };

        for trade in &trades[book.applied()..] {
            book.apply(trade)?;
        }

        let result = book.to_reconstruction();
        *self.slot() = Some(Arc::new(Checkpoint {
            book,
            prefix: trades.to_vec(),
        }));
        Ok(result)
    }

    pub fn invalidate(&self) {
        *self.slot() = None;
    }

    pub fn checkpointed(&self) -> Option<usize> {
        self.slot().as_deref().map(Checkpoint::applied)
    }
}
