use crate::{
    api::models::api_keys::{ApiKeyCreate, ApiKeyResponse},
    auth::CurrentUser,
    db::models::api_keys::ApiKeyCreateDBRequest,
    errors::{Error, Result},
    types::ApiKeyId,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

/// Fetch a key and verify the caller may operate on it (owner or admin).
async fn owned_api_key(state: &AppState, user: &CurrentUser, id: ApiKeyId) -> Result<()> {
    let key = state.store.get_api_key(id).await?.ok_or_else(|| Error::NotFound {
        resource: "API key".to_string(),
        id: id.to_string(),
    })?;

    if key.user_id != user.id && !user.is_admin {
        return Err(Error::Forbidden {
            message: "You do not own this API key".to_string(),
        });
    }
    Ok(())
}

/// Create an API key for one of the caller's databases.
#[utoipa::path(
    post,
    path = "/api-keys",
    tag = "api_keys",
    summary = "Create API key",
    request_body = ApiKeyCreate,
    responses(
        (status = 201, description = "API key created", body = ApiKeyResponse),
        (status = 400, description = "Invalid API key data"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the database owner"),
        (status = 404, description = "Database not found"),
    )
)]
pub async fn create_api_key(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(data): Json<ApiKeyCreate>,
) -> Result<(StatusCode, Json<ApiKeyResponse>)> {
    if data.name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "API key name cannot be empty".to_string(),
        });
    }

    // Keys may only be minted against databases the caller controls
    super::owned_database(&state, &current_user, data.database_id).await?;

    let key = state
        .store
        .create_api_key(&ApiKeyCreateDBRequest {
            database_id: data.database_id,
            user_id: current_user.id,
            name: data.name.trim().to_string(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiKeyResponse::from(key))))
}

/// List the caller's API keys, newest first.
#[utoipa::path(
    get,
    path = "/api-keys",
    tag = "api_keys",
    summary = "List API keys",
    responses(
        (status = 200, description = "List of API keys", body = [ApiKeyResponse]),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_api_keys(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<Vec<ApiKeyResponse>>> {
    let keys = state.store.list_api_keys(current_user.id).await?;
    Ok(Json(keys.into_iter().map(ApiKeyResponse::from).collect()))
}

/// Replace the key's secret with a fresh one. The old secret stops working
/// immediately.
#[utoipa::path(
    post,
    path = "/api-keys/{id}/regenerate",
    tag = "api_keys",
    summary = "Regenerate API key",
    params(("id" = uuid::Uuid, Path, description = "API key ID")),
    responses(
        (status = 200, description = "Key regenerated", body = ApiKeyResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "API key not found"),
    )
)]
pub async fn regenerate_api_key(
    State(state): State<AppState>,
    Path(id): Path<ApiKeyId>,
    current_user: CurrentUser,
) -> Result<Json<ApiKeyResponse>> {
    owned_api_key(&state, &current_user, id).await?;

    let key = state.store.regenerate_api_key(id).await?.ok_or_else(|| Error::NotFound {
        resource: "API key".to_string(),
        id: id.to_string(),
    })?;
    Ok(Json(ApiKeyResponse::from(key)))
}

#[utoipa::path(
    patch,
    path = "/api-keys/{id}/activate",
    tag = "api_keys",
    summary = "Activate API key",
    params(("id" = uuid::Uuid, Path, description = "API key ID")),
    responses(
        (status = 200, description = "Key activated", body = ApiKeyResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "API key not found"),
    )
)]
pub async fn activate_api_key(
    State(state): State<AppState>,
    Path(id): Path<ApiKeyId>,
    current_user: CurrentUser,
) -> Result<Json<ApiKeyResponse>> {
    set_active(state, current_user, id, true).await
}

/// Deactivated keys fail gateway authentication exactly like unknown ones.
#[utoipa::path(
    patch,
    path = "/api-keys/{id}/deactivate",
    tag = "api_keys",
    summary = "Deactivate API key",
    params(("id" = uuid::Uuid, Path, description = "API key ID")),
    responses(
        (status = 200, description = "Key deactivated", body = ApiKeyResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "API key not found"),
    )
)]
pub async fn deactivate_api_key(
    State(state): State<AppState>,
    Path(id): Path<ApiKeyId>,
    current_user: CurrentUser,
) -> Result<Json<ApiKeyResponse>> {
    set_active(state, current_user, id, false).await
}

async fn set_active(state: AppState, current_user: CurrentUser, id: ApiKeyId, active: bool) -> Result<Json<ApiKeyResponse>> {
    owned_api_key(&state, &current_user, id).await?;

    let key = state
        .store
        .set_api_key_active(id, active)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "API key".to_string(),
            id: id.to_string(),
        })?;
    Ok(Json(ApiKeyResponse::from(key)))
}

/// Delete a key. Immediate, no undo.
#[utoipa::path(
    delete,
    path = "/api-keys/{id}",
    tag = "api_keys",
    summary = "Delete API key",
    params(("id" = uuid::Uuid, Path, description = "API key ID")),
    responses(
        (status = 204, description = "Key deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "API key not found"),
    )
)]
pub async fn delete_api_key(
    State(state): State<AppState>,
    Path(id): Path<ApiKeyId>,
    current_user: CurrentUser,
) -> Result<StatusCode> {
    owned_api_key(&state, &current_user, id).await?;
    state.store.delete_api_key(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
