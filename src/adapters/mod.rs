//! Concrete adapter implementations for ports.

pub mod csv_quote_adapter;
pub mod file_config_adapter;
pub mod history_export;
pub mod json_ledger;
pub mod memory_ledger;
pub mod mock_quote_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_ledger;
pub mod system_clock;
pub mod timed_quote_adapter;
#[cfg(feature = "web")]
pub mod web;
