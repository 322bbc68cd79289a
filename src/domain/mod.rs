//! Core domain types and logic.

pub mod trade;
pub mod holding;
pub mod reconstruction;
pub mod checkpoint;
pub mod valuation;
pub mod portfolio_service;
pub mod gateway;
pub mod settings;
pub mod error;
