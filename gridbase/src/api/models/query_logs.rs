//! API models for query logs.

use crate::db::models::query_logs::QueryLogEntry;
use crate::types::{DatabaseId, QueryLogId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

/// Filters for listing query logs
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListQueryLogsQuery {
    #[param(value_type = Option<Uuid>)]
    pub database_id: Option<DatabaseId>,
    /// One of select/insert/update/delete
    pub method: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueryLogResponse {
    #[schema(value_type = Uuid)]
    pub id: QueryLogId,
    #[schema(value_type = Uuid)]
    pub database_id: DatabaseId,
    #[schema(value_type = Uuid)]
    pub user_id: UserId,
    pub method: String,
    pub endpoint: String,
    pub status_code: i32,
    pub response_time_ms: i64,
    pub request_body: Value,
    pub created_at: DateTime<Utc>,
}

impl From<QueryLogEntry> for QueryLogResponse {
    fn from(entry: QueryLogEntry) -> Self {
        Self {
            id: entry.id,
            database_id: entry.database_id,
            user_id: entry.user_id,
            method: entry.method,
            endpoint: entry.endpoint,
            status_code: entry.status_code,
            response_time_ms: entry.response_time_ms,
            request_body: entry.request_body,
            created_at: entry.created_at,
        }
    }
}
