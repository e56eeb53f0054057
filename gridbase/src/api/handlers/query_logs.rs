use crate::{
    api::models::query_logs::{ListQueryLogsQuery, QueryLogResponse},
    auth::CurrentUser,
    db::models::query_logs::QueryLogFilter,
    errors::{Error, Result},
    AppState,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};

const DEFAULT_LOG_LIMIT: i64 = 200;
const MAX_LOG_LIMIT: i64 = 1000;

/// List audited gateway calls, newest first.
///
/// Non-admin callers only ever see their own entries; admins see everything.
#[utoipa::path(
    get,
    path = "/query-logs",
    tag = "query_logs",
    summary = "List query logs",
    params(ListQueryLogsQuery),
    responses(
        (status = 200, description = "List of query log entries", body = [QueryLogResponse]),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_query_logs(
    State(state): State<AppState>,
    Query(query): Query<ListQueryLogsQuery>,
    current_user: CurrentUser,
) -> Result<Json<Vec<QueryLogResponse>>> {
    let filter = QueryLogFilter {
        user_id: if current_user.is_admin { None } else { Some(current_user.id) },
        database_id: query.database_id,
        method: query.method,
        limit: query.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(0, MAX_LOG_LIMIT),
    };

    let logs = state.store.list_query_logs(&filter).await?;
    Ok(Json(logs.into_iter().map(QueryLogResponse::from).collect()))
}

/// Clear the entire audit log. Admin only.
#[utoipa::path(
    delete,
    path = "/query-logs",
    tag = "query_logs",
    summary = "Clear query logs",
    responses(
        (status = 204, description = "Logs cleared"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
    )
)]
pub async fn clear_query_logs(State(state): State<AppState>, current_user: CurrentUser) -> Result<StatusCode> {
    if !current_user.is_admin {
        return Err(Error::Forbidden {
            message: "Only administrators may clear query logs".to_string(),
        });
    }

    let removed = state.store.clear_query_logs().await?;
    tracing::info!(removed, "query logs cleared by {}", current_user.id);
    Ok(StatusCode::NO_CONTENT)
}
