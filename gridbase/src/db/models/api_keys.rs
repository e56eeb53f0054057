//! Storage models for API keys.

use crate::types::{ApiKeyId, DatabaseId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A data-plane credential scoped to one database.
///
/// `key_value` is the opaque secret presented by clients (`gb_` + 64 hex
/// chars); it is unique across the platform and compared for exact equality.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub database_id: DatabaseId,
    pub user_id: UserId,
    pub name: String,
    pub key_value: String,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The tenant identity resolved from a valid, active API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyAuth {
    pub key_id: ApiKeyId,
    pub database_id: DatabaseId,
    pub user_id: UserId,
}

/// Storage request for creating a new API key.
///
/// The secret itself is generated inside the store, never supplied by callers.
#[derive(Debug, Clone)]
pub struct ApiKeyCreateDBRequest {
    pub database_id: DatabaseId,
    pub user_id: UserId,
    pub name: String,
}
