//! Axum route handlers for the management API.

pub mod api_keys;
pub mod databases;
pub mod query_logs;
pub mod rows;
pub mod tables;

use crate::auth::CurrentUser;
use crate::db::models::{databases::Database, tables::TableDef};
use crate::errors::{Error, Result};
use crate::types::{DatabaseId, TableId};
use crate::AppState;

/// Fetch a database and verify the caller may operate on it (owner or admin).
pub(crate) async fn owned_database(state: &AppState, user: &CurrentUser, database_id: DatabaseId) -> Result<Database> {
    let database = state
        .store
        .get_database(database_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Database".to_string(),
            id: database_id.to_string(),
        })?;

    if database.user_id != user.id && !user.is_admin {
        return Err(Error::Forbidden {
            message: "You do not own this database".to_string(),
        });
    }
    Ok(database)
}

/// Fetch a table nested under a database the caller may operate on, checking
/// that the table actually belongs to that database.
pub(crate) async fn owned_table(
    state: &AppState,
    user: &CurrentUser,
    database_id: DatabaseId,
    table_id: TableId,
) -> Result<TableDef> {
    owned_database(state, user, database_id).await?;

    let table = state.store.get_table(table_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Table".to_string(),
        id: table_id.to_string(),
    })?;

    if table.database_id != database_id {
        return Err(Error::NotFound {
            resource: "Table".to_string(),
            id: table_id.to_string(),
        });
    }
    Ok(table)
}
