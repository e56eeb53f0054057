//! The storage contract shared by both backends.
//!
//! A single trait rather than one repository per entity: the gateway needs
//! key auth, table resolution, row operations and audit logging as one
//! coherent surface, and the management API reuses the same handle. Both
//! [`super::MemStore`] and [`super::PgStore`] implement every method with
//! identical semantics; integration tests run against the in-memory backend.

use std::collections::HashMap;

use crate::db::errors::Result;
use crate::db::models::{
    api_keys::{ApiKey, ApiKeyCreateDBRequest, KeyAuth},
    databases::{Database, DatabaseCreateDBRequest},
    query_logs::{QueryLogCreate, QueryLogEntry, QueryLogFilter},
    rows::{Document, RowRecord},
    tables::{ColumnDef, ColumnSpec, TableCreateDBRequest, TableDef},
};
use crate::types::{ApiKeyId, DatabaseId, RowId, TableId, UserId};

/// Hard cap on rows returned by a gateway select. No pagination cursor: the
/// wire contract returns the first 100 rows by creation order.
pub const SELECT_ROW_LIMIT: i64 = 100;

#[async_trait::async_trait]
pub trait Datastore: Send + Sync {
    // --- key store ---

    /// Resolve an API key secret to its tenant identity.
    ///
    /// Returns `None` for unknown and for inactive keys alike; callers cannot
    /// distinguish the two.
    async fn authenticate(&self, secret: &str) -> Result<Option<KeyAuth>>;

    /// Update a key's last_used_at to now. Called off the response path.
    async fn touch_api_key(&self, id: ApiKeyId) -> Result<()>;

    async fn create_api_key(&self, request: &ApiKeyCreateDBRequest) -> Result<ApiKey>;

    async fn get_api_key(&self, id: ApiKeyId) -> Result<Option<ApiKey>>;

    /// List keys owned by a user, newest first.
    async fn list_api_keys(&self, user_id: UserId) -> Result<Vec<ApiKey>>;

    /// Replace the key's secret with a fresh one. The old secret is
    /// invalidated immediately and irreversibly.
    async fn regenerate_api_key(&self, id: ApiKeyId) -> Result<Option<ApiKey>>;

    async fn set_api_key_active(&self, id: ApiKeyId, active: bool) -> Result<Option<ApiKey>>;

    async fn delete_api_key(&self, id: ApiKeyId) -> Result<bool>;

    // --- databases ---

    async fn create_database(&self, request: &DatabaseCreateDBRequest) -> Result<Database>;

    async fn get_database(&self, id: DatabaseId) -> Result<Option<Database>>;

    /// List databases owned by a user, newest first.
    async fn list_databases(&self, user_id: UserId) -> Result<Vec<Database>>;

    /// Delete a database and everything under it: tables, columns, rows,
    /// API keys and query logs.
    async fn delete_database(&self, id: DatabaseId) -> Result<bool>;

    // --- schema resolver ---

    /// Exact, case-sensitive table name lookup within a database.
    async fn resolve_table(&self, database_id: DatabaseId, name: &str) -> Result<Option<TableId>>;

    async fn create_table(&self, request: &TableCreateDBRequest) -> Result<TableDef>;

    async fn get_table(&self, id: TableId) -> Result<Option<TableDef>>;

    async fn list_tables(&self, database_id: DatabaseId) -> Result<Vec<TableDef>>;

    async fn delete_table(&self, id: TableId) -> Result<bool>;

    /// Append a column definition (the only supported schema migration).
    async fn add_column(&self, table_id: TableId, spec: &ColumnSpec) -> Result<ColumnDef>;

    async fn list_columns(&self, table_id: TableId) -> Result<Vec<ColumnDef>>;

    // --- row store ---

    /// Equality-filtered scan, filters ANDed against the string form of each
    /// document field, ordered by creation time ascending, capped at
    /// [`SELECT_ROW_LIMIT`].
    async fn select_rows(&self, table_id: TableId, filters: &HashMap<String, String>) -> Result<Vec<RowRecord>>;

    /// Unfiltered page of rows by creation order (data explorer).
    async fn list_rows(&self, table_id: TableId, skip: i64, limit: i64) -> Result<Vec<RowRecord>>;

    async fn insert_row(&self, table_id: TableId, data: Document) -> Result<RowRecord>;

    /// Shallow merge: overlay the patch's top-level keys onto the stored
    /// document and persist the result whole. `None` when the row does not
    /// exist under this table.
    async fn merge_row(&self, table_id: TableId, row_id: RowId, patch: Document) -> Result<Option<RowRecord>>;

    /// Replace the stored document in its entirety (data explorer).
    async fn replace_row(&self, table_id: TableId, row_id: RowId, data: Document) -> Result<Option<RowRecord>>;

    /// Returns false when the row does not exist under this table; deletion
    /// is deliberately not idempotent at the API surface.
    async fn delete_row(&self, table_id: TableId, row_id: RowId) -> Result<bool>;

    // --- audit log ---

    async fn record_query_log(&self, entry: &QueryLogCreate) -> Result<()>;

    /// Newest first, capped by `filter.limit`.
    async fn list_query_logs(&self, filter: &QueryLogFilter) -> Result<Vec<QueryLogEntry>>;

    /// Bulk-clear all entries, returning the number removed. Admin only;
    /// enforced at the API layer.
    async fn clear_query_logs(&self) -> Result<u64>;
}
