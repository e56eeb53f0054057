use crate::{
    api::models::rows::RowListQuery,
    auth::CurrentUser,
    errors::{Error, Result},
    types::{DatabaseId, RowId, TableId},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::Value;

/// Largest explorer page; requests asking for more are clamped.
const MAX_PAGE_SIZE: i64 = 200;

fn require_document(body: Value) -> Result<serde_json::Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(Error::BadRequest {
            message: "Row data must be a JSON object".to_string(),
        }),
    }
}

/// Page through a table's rows in creation order (data explorer).
#[utoipa::path(
    get,
    path = "/databases/{db_id}/tables/{table_id}/rows",
    tag = "rows",
    summary = "List rows",
    params(
        ("db_id" = uuid::Uuid, Path, description = "Database ID"),
        ("table_id" = uuid::Uuid, Path, description = "Table ID"),
        RowListQuery,
    ),
    responses(
        (status = 200, description = "Page of flattened rows"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Table not found"),
    )
)]
pub async fn list_rows(
    State(state): State<AppState>,
    Path((db_id, table_id)): Path<(DatabaseId, TableId)>,
    Query(query): Query<RowListQuery>,
    current_user: CurrentUser,
) -> Result<Json<Vec<Value>>> {
    super::owned_table(&state, &current_user, db_id, table_id).await?;

    let limit = query.limit.clamp(0, MAX_PAGE_SIZE);
    let rows = state.store.list_rows(table_id, query.skip, limit).await?;
    Ok(Json(rows.iter().map(|row| row.flatten()).collect()))
}

/// Replace a row's document in its entirety.
///
/// Explorer semantics: unlike the gateway's merge-on-update, the stored
/// document becomes exactly the submitted object.
#[utoipa::path(
    put,
    path = "/databases/{db_id}/tables/{table_id}/rows/{row_id}",
    tag = "rows",
    summary = "Replace row",
    params(
        ("db_id" = uuid::Uuid, Path, description = "Database ID"),
        ("table_id" = uuid::Uuid, Path, description = "Table ID"),
        ("row_id" = uuid::Uuid, Path, description = "Row ID"),
    ),
    responses(
        (status = 200, description = "Replaced row, flattened"),
        (status = 400, description = "Body is not a JSON object"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Table or row not found"),
    )
)]
pub async fn replace_row(
    State(state): State<AppState>,
    Path((db_id, table_id, row_id)): Path<(DatabaseId, TableId, RowId)>,
    current_user: CurrentUser,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    super::owned_table(&state, &current_user, db_id, table_id).await?;
    let data = require_document(body)?;

    let row = state
        .store
        .replace_row(table_id, row_id, data)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Row".to_string(),
            id: row_id.to_string(),
        })?;
    Ok(Json(row.flatten()))
}

/// Delete a single row.
#[utoipa::path(
    delete,
    path = "/databases/{db_id}/tables/{table_id}/rows/{row_id}",
    tag = "rows",
    summary = "Delete row",
    params(
        ("db_id" = uuid::Uuid, Path, description = "Database ID"),
        ("table_id" = uuid::Uuid, Path, description = "Table ID"),
        ("row_id" = uuid::Uuid, Path, description = "Row ID"),
    ),
    responses(
        (status = 204, description = "Row deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Table or row not found"),
    )
)]
pub async fn delete_row(
    State(state): State<AppState>,
    Path((db_id, table_id, row_id)): Path<(DatabaseId, TableId, RowId)>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    super::owned_table(&state, &current_user, db_id, table_id).await?;

    if !state.store.delete_row(table_id, row_id).await? {
        return Err(Error::NotFound {
            resource: "Row".to_string(),
            id: row_id.to_string(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}
