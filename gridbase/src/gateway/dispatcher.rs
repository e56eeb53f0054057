//! The gateway request state machine.
//!
//! Received → Authenticated → TableResolved → Executed → Logged → Responded.
//! Envelope validation happens before authentication; authentication always
//! happens before table resolution, so an invalid key learns nothing about
//! which tables exist. Every post-auth outcome, success or failure, is
//! audited, and the audit write is spawned off the response path so logging
//! can never add latency or surface an error to the caller.

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::db::models::api_keys::KeyAuth;
use crate::db::models::query_logs::QueryLogCreate;
use crate::AppState;

use super::envelope::{QueryEnvelope, RowOperation, ValidatedQuery};
use super::errors::GatewayError;

/// The single generic data endpoint.
#[utoipa::path(
    post,
    path = "/api/v1/data",
    tag = "gateway",
    summary = "Execute a data action",
    description = "Run select/insert/update/delete against one of the authenticated database's tables",
    request_body = QueryEnvelope,
    responses(
        (status = 200, description = "Action executed"),
        (status = 201, description = "Row inserted"),
        (status = 400, description = "Malformed envelope or payload"),
        (status = 401, description = "Invalid or inactive API key"),
        (status = 404, description = "Table or row not found"),
        (status = 500, description = "Storage failure"),
    )
)]
pub async fn handle_query(State(state): State<AppState>, body: Bytes) -> Response {
    let started = Instant::now();

    // Received: parse + validate, before any store access
    let envelope: QueryEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(_) => {
            return GatewayError::MalformedEnvelope {
                message: "Request body must be a JSON object".to_string(),
            }
            .into_response()
        }
    };
    let query = match envelope.validate() {
        Ok(query) => query,
        Err(error) => return error.into_response(),
    };

    // Authenticated: deny-first, always before table resolution
    let auth = match state.store.authenticate(&query.api_key).await {
        Ok(Some(auth)) => auth,
        Ok(None) => return GatewayError::InvalidKey.into_response(),
        Err(error) => return GatewayError::from(error).into_response(),
    };

    // TableResolved + Executed
    let outcome = execute(&state, auth.database_id, &query).await;
    let response_time_ms = started.elapsed().as_millis() as i64;

    // Logged: best-effort for every post-auth outcome, off the response path
    let status = match &outcome {
        Ok((status, _)) => *status,
        Err(error) => error.status_code(),
    };
    spawn_audit(&state, auth, &query, status, response_time_ms, outcome.is_ok());

    // Responded
    match outcome {
        Ok((status, data)) => (status, Json(json!({ "success": true, "data": data }))).into_response(),
        Err(error) => error.into_response(),
    }
}

async fn execute(state: &AppState, database_id: uuid::Uuid, query: &ValidatedQuery) -> Result<(StatusCode, Value), GatewayError> {
    let table_id = state
        .store
        .resolve_table(database_id, &query.table)
        .await?
        .ok_or_else(|| GatewayError::TableNotFound {
            table: query.table.clone(),
        })?;

    match &query.operation {
        RowOperation::Select { filters } => {
            let rows = state.store.select_rows(table_id, filters).await?;
            let flattened: Vec<Value> = rows.iter().map(|row| row.flatten()).collect();
            Ok((StatusCode::OK, Value::Array(flattened)))
        }
        RowOperation::Insert { data } => {
            let row = state.store.insert_row(table_id, data.clone()).await?;
            Ok((StatusCode::CREATED, row.flatten()))
        }
        RowOperation::Update { row_id, patch } => {
            let row = state
                .store
                .merge_row(table_id, *row_id, patch.clone())
                .await?
                .ok_or(GatewayError::RowNotFound)?;
            Ok((StatusCode::OK, row.flatten()))
        }
        RowOperation::Delete { row_id } => {
            let deleted = state.store.delete_row(table_id, *row_id).await?;
            if !deleted {
                return Err(GatewayError::RowNotFound);
            }
            Ok((StatusCode::OK, json!({ "deleted": true })))
        }
    }
}

/// Fire-and-forget audit write plus the success-path last_used_at touch.
/// Failures are traced and swallowed; the caller never sees them.
fn spawn_audit(state: &AppState, auth: KeyAuth, query: &ValidatedQuery, status: StatusCode, response_time_ms: i64, success: bool) {
    let filters = match &query.operation {
        RowOperation::Select { filters } => json!(filters),
        _ => Value::Null,
    };
    let entry = QueryLogCreate {
        database_id: auth.database_id,
        user_id: auth.user_id,
        method: query.operation.action().to_string(),
        endpoint: format!("/{}", query.table),
        status_code: status.as_u16() as i32,
        response_time_ms,
        // Redacted snapshot: never row data
        request_body: json!({
            "action": query.operation.action(),
            "table": query.table,
            "filters": filters,
        }),
    };

    let store = state.store.clone();
    tokio::spawn(async move {
        if let Err(error) = store.record_query_log(&entry).await {
            tracing::warn!("failed to record query log: {:#}", error);
        }
        if success {
            if let Err(error) = store.touch_api_key(auth.key_id).await {
                tracing::debug!("failed to update key last_used_at: {:#}", error);
            }
        }
    });
}
