//! API models for databases.

use crate::db::models::databases::Database;
use crate::types::{DatabaseId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request to create a new database
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DatabaseCreate {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DatabaseResponse {
    #[schema(value_type = Uuid)]
    pub id: DatabaseId,
    #[schema(value_type = Uuid)]
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Database> for DatabaseResponse {
    fn from(database: Database) -> Self {
        Self {
            id: database.id,
            user_id: database.user_id,
            name: database.name,
            description: database.description,
            status: database.status,
            created_at: database.created_at,
        }
    }
}
