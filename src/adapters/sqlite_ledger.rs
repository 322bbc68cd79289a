//! SQLite ledger adapter.
//!
//! Money is stored as TEXT so that decimal values round-trip exactly.
//! The `seq` column fixes ledger order.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::debug;

use crate::domain::error::PapertraderError;
use crate::domain::trade::{TradeRecord, check_append, format_timestamp, parse_timestamp};
use crate::ports::ledger_port::LedgerPort;

const SELECT_COLUMNS: &str = "symbol, quantity, action, price, total, timestamp";

pub struct SqliteLedger {
    pool: Pool<SqliteConnectionManager>,
    writer: Mutex<()>,
}

/// A row as stored, before it is decoded into a [`TradeRecord`].
struct RawTrade {
    symbol: String,
    quantity: i64,
    action: String,
    price: String,
    total: String,
    timestamp: String,
}

impl RawTrade {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RawTrade {
            symbol: row.get(0)?,
            quantity: row.get(1)?,
            action: row.get(2)?,
            price: row.get(3)?,
            total: row.get(4)?,
            timestamp: row.get(5)?,
        })
    }

    fn decode(self, index: usize) -> Result<TradeRecord, PapertraderError> {
        let malformed = |reason: String| PapertraderError::MalformedTrade { index, reason };
        let action = self
            .action
            .parse()
            .map_err(|e: crate::domain::error::ValidationError| malformed(e.to_string()))?;
        let price = Decimal::from_str(&self.price)
            .map_err(|e| malformed(format!("price {:?}: {e}", self.price)))?;
        let total = Decimal::from_str(&self.total)
            .map_err(|e| malformed(format!("total {:?}: {e}", self.total)))?;
        let timestamp = parse_timestamp(&self.timestamp)
            .ok_or_else(|| malformed(format!("invalid timestamp {:?}", self.timestamp)))?;
        Ok(TradeRecord {
            symbol: self.symbol,
            quantity: self.quantity,
            action,
            price,
            total,
            timestamp,
        })
    }
}

fn pool_error(e: r2d2::Error) -> PapertraderError {
    PapertraderError::Database {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> PapertraderError {
    PapertraderError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl SqliteLedger {
    /// Opens (or creates) the ledger database at `path` and ensures the schema.
    pub fn open<P: AsRef<Path>>(path: P, pool_size: u32) -> Result<Self, PapertraderError> {
        let manager = SqliteConnectionManager::file(path.as_ref());
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_error)?;
        let ledger = Self {
            pool,
            writer: Mutex::new(()),
        };
        ledger.initialize_schema()?;
        Ok(ledger)
    }

    /// A private in-memory database. Limited to one connection so every
    /// caller sees the same database.
    pub fn in_memory() -> Result<Self, PapertraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;
        let ledger = Self {
            pool,
            writer: Mutex::new(()),
        };
        ledger.initialize_schema()?;
        Ok(ledger)
    }

    pub fn initialize_schema(&self) -> Result<(), PapertraderError> {
        let conn = self.pool.get().map_err(pool_error)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS trades (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                action TEXT NOT NULL,
                price TEXT NOT NULL,
                total TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_trades_symbol ON trades(symbol);",
        )
        .map_err(query_error)?;
        Ok(())
    }
}

impl LedgerPort for SqliteLedger {
    fn append(&self, record: &TradeRecord) -> Result<(), PapertraderError> {
        let _guard = self
            .writer
            .lock()
            .map_err(|_| PapertraderError::Ledger {
                reason: "ledger lock poisoned".into(),
            })?;
        let mut conn = self.pool.get().map_err(pool_error)?;
        // The writer mutex only covers this process; IMMEDIATE takes the
        // database write lock before the last row is read.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_error)?;

        let (count, last): (i64, Option<RawTrade>) = {
            let count = tx
                .query_row("SELECT COUNT(*) FROM trades", [], |row| row.get(0))
                .map_err(query_error)?;
            let last = tx
                .query_row(
                    &format!("SELECT {SELECT_COLUMNS} FROM trades ORDER BY seq DESC LIMIT 1"),
                    [],
                    RawTrade::from_row,
                )
                .optional()
                .map_err(query_error)?;
            (count, last)
        };
        let last = match last {
            Some(raw) => Some(raw.decode(count.saturating_sub(1) as usize)?),
            None => None,
        };
        check_append(last.as_ref(), record)?;

        tx.execute(
            "INSERT INTO trades (symbol, quantity, action, price, total, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.symbol,
                record.quantity,
                record.action.as_str(),
                record.price.to_string(),
                record.total.to_string(),
                format_timestamp(&record.timestamp),
            ],
        )
        .map_err(query_error)?;
        tx.commit().map_err(query_error)?;

        debug!(symbol = %record.symbol, index = count, "appended trade");
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<TradeRecord>, PapertraderError> {
        let conn = self.pool.get().map_err(pool_error)?;
        let mut stmt = conn
            .prepare(&format!("SELECT {SELECT_COLUMNS} FROM trades ORDER BY seq"))
            .map_err(query_error)?;
        let rows = stmt
            .query_map([], RawTrade::from_row)
            .map_err(query_error)?;

        let mut trades = Vec::new();
        for (index, row) in rows.enumerate() {
            let raw = row.map_err(|e| PapertraderError::MalformedTrade {
                index,
                reason: e.to_string(),
            })?;
            trades.push(raw.decode(index)?);
        }
        Ok(trades)
    }

    fn len(&self) -> Result<usize, PapertraderError> {
        let conn = self.pool.get().map_err(pool_error)?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM trades", [], |row| row.get(0))
            .map_err(query_error)?;
        Ok(count as usize)
    }
}
