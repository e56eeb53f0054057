//! API models for tables and columns.

use crate::db::models::tables::{ColumnDef, ColumnSpec, TableDef};
use crate::types::{ColumnId, DatabaseId, TableId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn default_nullable() -> bool {
    true
}

/// Column shape supplied at table creation or column add time
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ColumnCreate {
    pub name: String,
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub is_nullable: bool,
    pub default_value: Option<String>,
}

impl From<ColumnCreate> for ColumnSpec {
    fn from(create: ColumnCreate) -> Self {
        Self {
            name: create.name,
            data_type: create.data_type,
            is_nullable: create.is_nullable,
            default_value: create.default_value,
        }
    }
}

/// Request to create a table with its initial columns
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TableCreate {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnCreate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TableResponse {
    #[schema(value_type = Uuid)]
    pub id: TableId,
    #[schema(value_type = Uuid)]
    pub database_id: DatabaseId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<TableDef> for TableResponse {
    fn from(table: TableDef) -> Self {
        Self {
            id: table.id,
            database_id: table.database_id,
            name: table.name,
            created_at: table.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ColumnResponse {
    #[schema(value_type = Uuid)]
    pub id: ColumnId,
    #[schema(value_type = Uuid)]
    pub table_id: TableId,
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub default_value: Option<String>,
    pub position: i32,
}

impl From<ColumnDef> for ColumnResponse {
    fn from(column: ColumnDef) -> Self {
        Self {
            id: column.id,
            table_id: column.table_id,
            name: column.name,
            data_type: column.data_type,
            is_nullable: column.is_nullable,
            default_value: column.default_value,
            position: column.position,
        }
    }
}
