//! JSON-lines file ledger adapter.
//!
//! One trade record per line, appended in order. A missing file is an
//! empty ledger. Appends hold the write lock for the whole
//! read-check-write cycle; reads share the lock so they never see a
//! half-written line.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

use crate::domain::error::PapertraderError;
use crate::domain::trade::{TradeRecord, check_append};
use crate::ports::ledger_port::LedgerPort;

pub struct JsonLedger {
    path: PathBuf,
    lock: RwLock<()>,
}

fn poisoned() -> PapertraderError {
    PapertraderError::Ledger {
        reason: "ledger lock poisoned".into(),
    }
}

impl JsonLedger {
    /// Opens the ledger at `path`, creating the parent directory if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PapertraderError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path,
            lock: RwLock::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<TradeRecord>, PapertraderError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PapertraderError::Ledger {
                    reason: format!("failed to read {}: {}", self.path.display(), e),
                });
            }
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(index, line)| {
                serde_json::from_str::<TradeRecord>(line).map_err(|e| {
                    PapertraderError::MalformedTrade {
                        index,
                        reason: e.to_string(),
                    }
                })
            })
            .collect()
    }
}

impl LedgerPort for JsonLedger {
    fn append(&self, record: &TradeRecord) -> Result<(), PapertraderError> {
        let _guard = self.lock.write().map_err(|_| poisoned())?;
        let existing = self.load()?;
        check_append(existing.last(), record)?;

        let line = serde_json::to_string(record).map_err(|e| PapertraderError::Ledger {
            reason: format!("failed to encode trade: {e}"),
        })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        file.flush()?;

        debug!(path = %self.path.display(), index = existing.len(), "appended trade");
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<TradeRecord>, PapertraderError> {
        let _guard = self.lock.read().map_err(|_| poisoned())?;
        self.load()
    }
}
