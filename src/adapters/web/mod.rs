//! HTTP API adapter.
//!
//! Exposes the portfolio summary, quote lookup, trade execution and trade
//! history as JSON endpoints over axum.

mod error;
mod handlers;

pub use error::{WebError, status_from_error};
pub use handlers::*;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::domain::gateway::TradeGateway;
use crate::domain::portfolio_service::PortfolioService;

pub struct AppState {
    pub portfolio: Arc<PortfolioService>,
    pub gateway: Arc<TradeGateway>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/portfolio/summary", get(handlers::portfolio_summary))
        .route("/trading/quote", get(handlers::trading_quote))
        .route("/trading/execute", post(handlers::execute_trade))
        .route("/trading/history", get(handlers::trade_history))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
