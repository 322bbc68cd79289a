//! JSON error responses for the web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::domain::error::{PapertraderError, PriceUnavailable};

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub fn status_from_error(err: &PapertraderError) -> StatusCode {
    match err {
        PapertraderError::Validation(_) => StatusCode::BAD_REQUEST,
        PapertraderError::PriceUnavailable(PriceUnavailable::NotFound { .. }) => {
            StatusCode::NOT_FOUND
        }
        PapertraderError::PriceUnavailable(PriceUnavailable::Unavailable { .. })
        | PapertraderError::QuoteSource { .. } => StatusCode::SERVICE_UNAVAILABLE,
        PapertraderError::MalformedTrade { .. }
        | PapertraderError::Ledger { .. }
        | PapertraderError::Database { .. }
        | PapertraderError::DatabaseQuery { .. }
        | PapertraderError::ConfigParse { .. }
        | PapertraderError::ConfigMissing { .. }
        | PapertraderError::ConfigInvalid { .. }
        | PapertraderError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<PapertraderError> for WebError {
    fn from(err: PapertraderError) -> Self {
        let status = status_from_error(&err);
        if status.is_server_error() {
            error!(error = %err, "request failed");
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "success": false, "error": self.message })),
        )
            .into_response()
    }
}
