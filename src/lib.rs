//! papertrader — simulated equity trading over an append-only trade ledger.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. Portfolio state is never stored;
//! it is rebuilt from the ledger on every request.

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
