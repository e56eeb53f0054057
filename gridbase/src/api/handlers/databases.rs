use crate::{
    api::models::databases::{DatabaseCreate, DatabaseResponse},
    auth::CurrentUser,
    db::models::{api_keys::ApiKeyCreateDBRequest, databases::DatabaseCreateDBRequest},
    errors::{Error, Result},
    types::DatabaseId,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

/// Create a database for the current user.
///
/// Also provisions a default API key so the database is usable through the
/// gateway immediately.
#[utoipa::path(
    post,
    path = "/databases",
    tag = "databases",
    summary = "Create database",
    request_body = DatabaseCreate,
    responses(
        (status = 201, description = "Database created", body = DatabaseResponse),
        (status = 400, description = "Invalid database data"),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn create_database(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(data): Json<DatabaseCreate>,
) -> Result<(StatusCode, Json<DatabaseResponse>)> {
    if data.name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Database name cannot be empty".to_string(),
        });
    }

    let database = state
        .store
        .create_database(&DatabaseCreateDBRequest {
            user_id: current_user.id,
            name: data.name.trim().to_string(),
            description: data.description,
        })
        .await?;

    state
        .store
        .create_api_key(&ApiKeyCreateDBRequest {
            database_id: database.id,
            user_id: current_user.id,
            name: "Default".to_string(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DatabaseResponse::from(database))))
}

/// List the current user's databases, newest first.
#[utoipa::path(
    get,
    path = "/databases",
    tag = "databases",
    summary = "List databases",
    responses(
        (status = 200, description = "List of databases", body = [DatabaseResponse]),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_databases(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<Vec<DatabaseResponse>>> {
    let databases = state.store.list_databases(current_user.id).await?;
    Ok(Json(databases.into_iter().map(DatabaseResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/databases/{id}",
    tag = "databases",
    summary = "Get database",
    params(("id" = uuid::Uuid, Path, description = "Database ID")),
    responses(
        (status = 200, description = "Database", body = DatabaseResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Database not found"),
    )
)]
pub async fn get_database(
    State(state): State<AppState>,
    Path(id): Path<DatabaseId>,
    current_user: CurrentUser,
) -> Result<Json<DatabaseResponse>> {
    let database = super::owned_database(&state, &current_user, id).await?;
    Ok(Json(DatabaseResponse::from(database)))
}

/// Delete a database and everything under it: tables, rows, keys and logs.
#[utoipa::path(
    delete,
    path = "/databases/{id}",
    tag = "databases",
    summary = "Delete database",
    params(("id" = uuid::Uuid, Path, description = "Database ID")),
    responses(
        (status = 204, description = "Database deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Database not found"),
    )
)]
pub async fn delete_database(
    State(state): State<AppState>,
    Path(id): Path<DatabaseId>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    super::owned_database(&state, &current_user, id).await?;
    state.store.delete_database(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
