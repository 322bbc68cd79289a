//! In-memory ledger adapter.

use std::sync::RwLock;

use crate::domain::error::PapertraderError;
use crate::domain::trade::{TradeRecord, check_append};
use crate::ports::ledger_port::LedgerPort;

#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: RwLock<Vec<TradeRecord>>,
}

fn poisoned() -> PapertraderError {
    PapertraderError::Ledger {
        reason: "ledger lock poisoned".into(),
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the ledger without validation, as if loaded from storage.
    pub fn from_records(records: Vec<TradeRecord>) -> Self {
        MemoryLedger {
            records: RwLock::new(records),
        }
    }
}

impl LedgerPort for MemoryLedger {
    fn append(&self, record: &TradeRecord) -> Result<(), PapertraderError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        check_append(records.last(), record)?;
        records.push(record.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<TradeRecord>, PapertraderError> {
        Ok(self.records.read().map_err(|_| poisoned())?.clone())
    }

    fn len(&self) -> Result<usize, PapertraderError> {
        Ok(self.records.read().map_err(|_| poisoned())?.len())
    }
}
