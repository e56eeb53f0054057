//! Storage models for table and column definitions.
//!
//! Column metadata is declarative only: the row store never validates
//! documents against it. It exists for the dashboard (display order,
//! insert forms) and is resolved separately from the write path.

use crate::types::{ColumnId, DatabaseId, TableId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user-defined table inside a database. Name is unique per database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TableDef {
    pub id: TableId,
    pub database_id: DatabaseId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A declared column on a table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ColumnDef {
    pub id: ColumnId,
    pub table_id: TableId,
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub default_value: Option<String>,
    pub position: i32,
}

/// Column shape supplied at table creation or column add time.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub default_value: Option<String>,
}

/// Storage request for creating a table together with its initial columns.
#[derive(Debug, Clone)]
pub struct TableCreateDBRequest {
    pub database_id: DatabaseId,
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}
