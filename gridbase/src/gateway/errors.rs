use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::errors::DbError;

/// Everything that can terminate a gateway call. All members are terminal
/// for the current call; nothing is retried internally. `StorageFailure` is
/// the only kind callers should treat as potentially transient.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Envelope is not a JSON object or is missing required fields
    #[error("{message}")]
    MalformedEnvelope { message: String },

    /// Action is not one of select/insert/update/delete. Never reaches the
    /// key store.
    #[error("Unknown action \"{action}\". Use: select, insert, update, delete")]
    UnknownAction { action: String },

    /// Unknown or inactive API key; the two are indistinguishable by design
    #[error("Invalid or inactive API key")]
    InvalidKey,

    /// No table with this name in the authenticated database
    #[error("Table \"{table}\" not found")]
    TableNotFound { table: String },

    /// Action-specific fields missing or shape-invalid
    #[error("{message}")]
    InvalidPayload { message: String },

    /// row_id does not exist under the resolved table
    #[error("Row not found")]
    RowNotFound,

    /// Any underlying store error, including transient ones
    #[error(transparent)]
    StorageFailure(#[from] DbError),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MalformedEnvelope { .. }
            | GatewayError::UnknownAction { .. }
            | GatewayError::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
            GatewayError::InvalidKey => StatusCode::UNAUTHORIZED,
            GatewayError::TableNotFound { .. } | GatewayError::RowNotFound => StatusCode::NOT_FOUND,
            GatewayError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The flat error string exposed on the wire. Storage detail stays
    /// server-side.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::StorageFailure(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            GatewayError::StorageFailure(error) => {
                tracing::error!("gateway storage failure: {:#}", error);
            }
            GatewayError::InvalidKey => {
                tracing::info!("gateway auth failure");
            }
            other => {
                tracing::debug!("gateway client error: {}", other);
            }
        }

        let body = json!({ "error": self.user_message() });
        (self.status_code(), Json(body)).into_response()
    }
}
