//! Storage models for logical databases.

use crate::types::{DatabaseId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tenant's logical namespace. Owns tables; referenced (not owned) by API keys.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Database {
    pub id: DatabaseId,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Storage request for creating a new database
#[derive(Debug, Clone)]
pub struct DatabaseCreateDBRequest {
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
}
