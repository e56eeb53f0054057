//! API models for API keys.

use crate::db::models::api_keys::ApiKey;
use crate::types::{ApiKeyId, DatabaseId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request to create a new API key for a database
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ApiKeyCreate {
    #[schema(value_type = Uuid)]
    pub database_id: DatabaseId,
    pub name: String,
}

/// An API key, secret included.
///
/// Keys are data-plane credentials owned by the requesting tenant, and the
/// dashboard supports revealing/copying them at any time, so the secret is
/// returned on every read, unlike platform credentials, which would only be
/// shown once at creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiKeyResponse {
    #[schema(value_type = Uuid)]
    pub id: ApiKeyId,
    #[schema(value_type = Uuid)]
    pub database_id: DatabaseId,
    #[schema(value_type = Uuid)]
    pub user_id: UserId,
    pub name: String,
    pub key_value: String,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            database_id: key.database_id,
            user_id: key.user_id,
            name: key.name,
            key_value: key.key_value,
            is_active: key.is_active,
            last_used_at: key.last_used_at,
            created_at: key.created_at,
        }
    }
}
