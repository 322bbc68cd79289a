//! Trade ledger port trait.

use crate::domain::error::PapertraderError;
use crate::domain::trade::TradeRecord;

/// Append-only, ordered store of trade records.
///
/// Implementations serialize appends (one writer at a time) and reject a
/// record that fails [`check_append`](crate::domain::trade::check_append)
/// against the last stored record. `read_all` returns a consistent copy in
/// append order and may run concurrently with other reads.
pub trait LedgerPort {
    fn append(&self, record: &TradeRecord) -> Result<(), PapertraderError>;

    fn read_all(&self) -> Result<Vec<TradeRecord>, PapertraderError>;

    fn len(&self) -> Result<usize, PapertraderError> {
        Ok(self.read_all()?.len())
    }

    fn is_empty(&self) -> Result<bool, PapertraderError> {
        Ok(self.len()? == 0)
    }
}
