//! HTTP request handlers for the web adapter.
//!
//! Service calls touch the ledger file or database, so each runs on the
//! blocking pool.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::domain::error::PapertraderError;
use crate::domain::gateway::OrderRequest;

use super::{AppState, WebError};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

async fn run_blocking<T, F>(f: F) -> Result<T, WebError>
where
    F: FnOnce() -> Result<T, PapertraderError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| WebError::internal(format!("worker failed: {e}")))?
        .map_err(WebError::from)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn portfolio_summary(State(state): State<Arc<AppState>>) -> Result<Response, WebError> {
    let portfolio = Arc::clone(&state.portfolio);
    let snapshot = run_blocking(move || portfolio.summary()).await?;
    Ok(Json(snapshot).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct QuoteParams {
    pub symbol: Option<String>,
}

pub async fn trading_quote(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QuoteParams>,
) -> Result<Response, WebError> {
    let gateway = Arc::clone(&state.gateway);
    let quote = run_blocking(move || gateway.quote(params.symbol.as_deref())).await?;
    Ok(Json(quote).into_response())
}

pub async fn execute_trade(
    State(state): State<Arc<AppState>>,
    body: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<Response, WebError> {
    let Json(order) = body.map_err(|e| WebError::bad_request(e.body_text()))?;
    let gateway = Arc::clone(&state.gateway);
    let trade = run_blocking(move || gateway.submit(order)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "trade": trade })),
    )
        .into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

pub async fn trade_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Response, WebError> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let gateway = Arc::clone(&state.gateway);
    let trades = run_blocking(move || gateway.history(Some(limit))).await?;
    Ok(Json(json!({ "trades": trades })).into_response())
}

pub async fn not_found() -> WebError {
    WebError::not_found("no such route")
}
