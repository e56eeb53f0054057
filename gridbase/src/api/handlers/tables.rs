use crate::{
    api::models::tables::{ColumnCreate, ColumnResponse, TableCreate, TableResponse},
    auth::CurrentUser,
    db::models::tables::TableCreateDBRequest,
    errors::{Error, Result},
    types::{DatabaseId, TableId},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

/// Create a table, optionally with its initial column definitions.
#[utoipa::path(
    post,
    path = "/databases/{db_id}/tables",
    tag = "tables",
    summary = "Create table",
    params(("db_id" = uuid::Uuid, Path, description = "Database ID")),
    request_body = TableCreate,
    responses(
        (status = 201, description = "Table created", body = TableResponse),
        (status = 400, description = "Invalid table data"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Database not found"),
        (status = 409, description = "Table name already in use"),
    )
)]
pub async fn create_table(
    State(state): State<AppState>,
    Path(db_id): Path<DatabaseId>,
    current_user: CurrentUser,
    Json(data): Json<TableCreate>,
) -> Result<(StatusCode, Json<TableResponse>)> {
    super::owned_database(&state, &current_user, db_id).await?;

    if data.name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Table name cannot be empty".to_string(),
        });
    }

    let table = state
        .store
        .create_table(&TableCreateDBRequest {
            database_id: db_id,
            name: data.name.trim().to_string(),
            columns: data.columns.into_iter().map(Into::into).collect(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TableResponse::from(table))))
}

/// List a database's tables in creation order.
#[utoipa::path(
    get,
    path = "/databases/{db_id}/tables",
    tag = "tables",
    summary = "List tables",
    params(("db_id" = uuid::Uuid, Path, description = "Database ID")),
    responses(
        (status = 200, description = "List of tables", body = [TableResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Database not found"),
    )
)]
pub async fn list_tables(
    State(state): State<AppState>,
    Path(db_id): Path<DatabaseId>,
    current_user: CurrentUser,
) -> Result<Json<Vec<TableResponse>>> {
    super::owned_database(&state, &current_user, db_id).await?;
    let tables = state.store.list_tables(db_id).await?;
    Ok(Json(tables.into_iter().map(TableResponse::from).collect()))
}

/// Delete a table and all data in it.
#[utoipa::path(
    delete,
    path = "/databases/{db_id}/tables/{table_id}",
    tag = "tables",
    summary = "Delete table",
    params(
        ("db_id" = uuid::Uuid, Path, description = "Database ID"),
        ("table_id" = uuid::Uuid, Path, description = "Table ID"),
    ),
    responses(
        (status = 204, description = "Table deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Table not found"),
    )
)]
pub async fn delete_table(
    State(state): State<AppState>,
    Path((db_id, table_id)): Path<(DatabaseId, TableId)>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    super::owned_table(&state, &current_user, db_id, table_id).await?;
    state.store.delete_table(table_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Append a column definition to a table. Adding columns is the only
/// supported schema migration; existing rows are untouched.
#[utoipa::path(
    post,
    path = "/databases/{db_id}/tables/{table_id}/columns",
    tag = "tables",
    summary = "Add column",
    params(
        ("db_id" = uuid::Uuid, Path, description = "Database ID"),
        ("table_id" = uuid::Uuid, Path, description = "Table ID"),
    ),
    request_body = ColumnCreate,
    responses(
        (status = 201, description = "Column added", body = ColumnResponse),
        (status = 400, description = "Invalid column data"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Table not found"),
        (status = 409, description = "Column name already in use"),
    )
)]
pub async fn add_column(
    State(state): State<AppState>,
    Path((db_id, table_id)): Path<(DatabaseId, TableId)>,
    current_user: CurrentUser,
    Json(data): Json<ColumnCreate>,
) -> Result<(StatusCode, Json<ColumnResponse>)> {
    super::owned_table(&state, &current_user, db_id, table_id).await?;

    if data.name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Column name cannot be empty".to_string(),
        });
    }

    let column = state.store.add_column(table_id, &data.into()).await?;
    Ok((StatusCode::CREATED, Json(ColumnResponse::from(column))))
}

/// List a table's declared columns in position order.
#[utoipa::path(
    get,
    path = "/databases/{db_id}/tables/{table_id}/columns",
    tag = "tables",
    summary = "List columns",
    params(
        ("db_id" = uuid::Uuid, Path, description = "Database ID"),
        ("table_id" = uuid::Uuid, Path, description = "Table ID"),
    ),
    responses(
        (status = 200, description = "List of columns", body = [ColumnResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Table not found"),
    )
)]
pub async fn list_columns(
    State(state): State<AppState>,
    Path((db_id, table_id)): Path<(DatabaseId, TableId)>,
    current_user: CurrentUser,
) -> Result<Json<Vec<ColumnResponse>>> {
    super::owned_table(&state, &current_user, db_id, table_id).await?;
    let columns = state.store.list_columns(table_id).await?;
    Ok(Json(columns.into_iter().map(ColumnResponse::from).collect()))
}
