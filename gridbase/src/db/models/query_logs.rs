//! Storage models for the append-only query audit log.

use crate::types::{DatabaseId, QueryLogId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// One audited gateway call. Never mutated after insertion; only bulk-cleared
/// by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QueryLogEntry {
    pub id: QueryLogId,
    pub database_id: DatabaseId,
    pub user_id: UserId,
    pub method: String,
    pub endpoint: String,
    pub status_code: i32,
    pub response_time_ms: i64,
    pub request_body: Value,
    pub created_at: DateTime<Utc>,
}

/// Storage request for recording one completed dispatch.
#[derive(Debug, Clone)]
pub struct QueryLogCreate {
    pub database_id: DatabaseId,
    pub user_id: UserId,
    pub method: String,
    pub endpoint: String,
    pub status_code: i32,
    pub response_time_ms: i64,
    /// Redacted snapshot of the request: action, table and filters only,
    /// never row data.
    pub request_body: Value,
}

/// Filter for listing query logs, newest first.
#[derive(Debug, Clone, Default)]
pub struct QueryLogFilter {
    /// Restrict to logs attributed to this user (set for non-admin callers).
    pub user_id: Option<UserId>,
    pub database_id: Option<DatabaseId>,
    pub method: Option<String>,
    pub limit: i64,
}
