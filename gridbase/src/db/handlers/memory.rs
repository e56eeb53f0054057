//! In-memory storage backend.
//!
//! The development/test deployment of the [`Datastore`] contract: everything
//! lives in process memory and is lost on shutdown. Semantics mirror the
//! PostgreSQL backend exactly (same cascades, same uniqueness rules, same
//! filter matching) so integration tests against this backend exercise the
//! real gateway behavior.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

use crate::crypto::generate_api_key;
use crate::db::errors::{DbError, Result};
use crate::db::models::{
    api_keys::{ApiKey, ApiKeyCreateDBRequest, KeyAuth},
    databases::{Database, DatabaseCreateDBRequest},
    query_logs::{QueryLogCreate, QueryLogEntry, QueryLogFilter},
    rows::{shallow_merge, Document, RowRecord},
    tables::{ColumnDef, ColumnSpec, TableCreateDBRequest, TableDef},
};
use crate::types::{ApiKeyId, DatabaseId, RowId, TableId, UserId};

use super::store::{Datastore, SELECT_ROW_LIMIT};

/// In-memory document store. Cheap to construct; every instance is fully
/// isolated.
#[derive(Default)]
pub struct MemStore {
    databases: DashMap<DatabaseId, Database>,
    api_keys: DashMap<ApiKeyId, ApiKey>,
    /// Secret -> key id index, so authentication is an O(1) lookup rather
    /// than a scan.
    secrets: DashMap<String, ApiKeyId>,
    tables: DashMap<TableId, TableDef>,
    columns: DashMap<TableId, Vec<ColumnDef>>,
    /// Rows per table in append order; append order is creation order.
    rows: DashMap<TableId, Vec<RowRecord>>,
    query_logs: RwLock<Vec<QueryLogEntry>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Text form of a document field, as Postgres `data->>key` would render it:
/// strings verbatim, JSON null as no value, everything else as its JSON text.
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn matches_filters(row: &RowRecord, filters: &HashMap<String, String>) -> bool {
    filters.iter().all(|(key, expected)| {
        row.data
            .get(key)
            .and_then(field_text)
            .is_some_and(|actual| actual == *expected)
    })
}

#[async_trait::async_trait]
impl Datastore for MemStore {
    async fn authenticate(&self, secret: &str) -> Result<Option<KeyAuth>> {
        let Some(key_id) = self.secrets.get(secret).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        let Some(key) = self.api_keys.get(&key_id) else {
            return Ok(None);
        };
        if !key.is_active {
            return Ok(None);
        }
        Ok(Some(KeyAuth {
            key_id: key.id,
            database_id: key.database_id,
            user_id: key.user_id,
        }))
    }

    async fn touch_api_key(&self, id: ApiKeyId) -> Result<()> {
        if let Some(mut key) = self.api_keys.get_mut(&id) {
            key.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn create_api_key(&self, request: &ApiKeyCreateDBRequest) -> Result<ApiKey> {
        let key = ApiKey {
            id: Uuid::new_v4(),
            database_id: request.database_id,
            user_id: request.user_id,
            name: request.name.clone(),
            key_value: generate_api_key(),
            is_active: true,
            last_used_at: None,
            created_at: Utc::now(),
        };
        self.secrets.insert(key.key_value.clone(), key.id);
        self.api_keys.insert(key.id, key.clone());
        Ok(key)
    }

    async fn get_api_key(&self, id: ApiKeyId) -> Result<Option<ApiKey>> {
        Ok(self.api_keys.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_api_keys(&self, user_id: UserId) -> Result<Vec<ApiKey>> {
        let mut keys: Vec<ApiKey> = self
            .api_keys
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(keys)
    }

    async fn regenerate_api_key(&self, id: ApiKeyId) -> Result<Option<ApiKey>> {
        let Some(mut key) = self.api_keys.get_mut(&id) else {
            return Ok(None);
        };
        let old_secret = std::mem::replace(&mut key.key_value, generate_api_key());
        self.secrets.remove(&old_secret);
        self.secrets.insert(key.key_value.clone(), key.id);
        Ok(Some(key.clone()))
    }

    async fn set_api_key_active(&self, id: ApiKeyId, active: bool) -> Result<Option<ApiKey>> {
        let Some(mut key) = self.api_keys.get_mut(&id) else {
            return Ok(None);
        };
        key.is_active = active;
        Ok(Some(key.clone()))
    }

    async fn delete_api_key(&self, id: ApiKeyId) -> Result<bool> {
        let Some((_, key)) = self.api_keys.remove(&id) else {
            return Ok(false);
        };
        self.secrets.remove(&key.key_value);
        Ok(true)
    }

    async fn create_database(&self, request: &DatabaseCreateDBRequest) -> Result<Database> {
        let database = Database {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            name: request.name.clone(),
            description: request.description.clone(),
            status: "active".to_string(),
            created_at: Utc::now(),
        };
        self.databases.insert(database.id, database.clone());
        Ok(database)
    }

    async fn get_database(&self, id: DatabaseId) -> Result<Option<Database>> {
        Ok(self.databases.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_databases(&self, user_id: UserId) -> Result<Vec<Database>> {
        let mut databases: Vec<Database> = self
            .databases
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        databases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(databases)
    }

    async fn delete_database(&self, id: DatabaseId) -> Result<bool> {
        if self.databases.remove(&id).is_none() {
            return Ok(false);
        }

        // Cascade: keys (and their secret index entries), tables with their
        // columns and rows, and the database's audit trail.
        let doomed_keys: Vec<ApiKeyId> = self
            .api_keys
            .iter()
            .filter(|entry| entry.database_id == id)
            .map(|entry| entry.id)
            .collect();
        for key_id in doomed_keys {
            if let Some((_, key)) = self.api_keys.remove(&key_id) {
                self.secrets.remove(&key.key_value);
            }
        }

        let doomed_tables: Vec<TableId> = self
            .tables
            .iter()
            .filter(|entry| entry.database_id == id)
            .map(|entry| entry.id)
            .collect();
        for table_id in doomed_tables {
            self.tables.remove(&table_id);
            self.columns.remove(&table_id);
            self.rows.remove(&table_id);
        }

        let mut logs = self.query_logs.write().expect("query log lock poisoned");
        logs.retain(|entry| entry.database_id != id);

        Ok(true)
    }

    async fn resolve_table(&self, database_id: DatabaseId, name: &str) -> Result<Option<TableId>> {
        Ok(self
            .tables
            .iter()
            .find(|entry| entry.database_id == database_id && entry.name == name)
            .map(|entry| entry.id))
    }

    async fn create_table(&self, request: &TableCreateDBRequest) -> Result<TableDef> {
        let duplicate = self
            .tables
            .iter()
            .any(|entry| entry.database_id == request.database_id && entry.name == request.name);
        if duplicate {
            return Err(DbError::UniqueViolation {
                constraint: Some("database_tables_database_id_name_key".to_string()),
                table: Some("database_tables".to_string()),
                message: format!("table \"{}\" already exists in this database", request.name),
            });
        }

        let table = TableDef {
            id: Uuid::new_v4(),
            database_id: request.database_id,
            name: request.name.clone(),
            created_at: Utc::now(),
        };
        let columns: Vec<ColumnDef> = request
            .columns
            .iter()
            .enumerate()
            .map(|(position, spec)| ColumnDef {
                id: Uuid::new_v4(),
                table_id: table.id,
                name: spec.name.clone(),
                data_type: spec.data_type.clone(),
                is_nullable: spec.is_nullable,
                default_value: spec.default_value.clone(),
                position: position as i32,
            })
            .collect();

        self.columns.insert(table.id, columns);
        self.rows.insert(table.id, Vec::new());
        self.tables.insert(table.id, table.clone());
        Ok(table)
    }

    async fn get_table(&self, id: TableId) -> Result<Option<TableDef>> {
        Ok(self.tables.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_tables(&self, database_id: DatabaseId) -> Result<Vec<TableDef>> {
        let mut tables: Vec<TableDef> = self
            .tables
            .iter()
            .filter(|entry| entry.database_id == database_id)
            .map(|entry| entry.value().clone())
            .collect();
        tables.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tables)
    }

    async fn delete_table(&self, id: TableId) -> Result<bool> {
        if self.tables.remove(&id).is_none() {
            return Ok(false);
        }
        self.columns.remove(&id);
        self.rows.remove(&id);
        Ok(true)
    }

    async fn add_column(&self, table_id: TableId, spec: &ColumnSpec) -> Result<ColumnDef> {
        if !self.tables.contains_key(&table_id) {
            return Err(DbError::NotFound);
        }
        let mut columns = self.columns.entry(table_id).or_default();
        if columns.iter().any(|column| column.name == spec.name) {
            return Err(DbError::UniqueViolation {
                constraint: Some("table_columns_table_id_name_key".to_string()),
                table: Some("table_columns".to_string()),
                message: format!("column \"{}\" already exists on this table", spec.name),
            });
        }
        let column = ColumnDef {
            id: Uuid::new_v4(),
            table_id,
            name: spec.name.clone(),
            data_type: spec.data_type.clone(),
            is_nullable: spec.is_nullable,
            default_value: spec.default_value.clone(),
            position: columns.len() as i32,
        };
        columns.push(column.clone());
        Ok(column)
    }

    async fn list_columns(&self, table_id: TableId) -> Result<Vec<ColumnDef>> {
        Ok(self.columns.get(&table_id).map(|entry| entry.value().clone()).unwrap_or_default())
    }

    async fn select_rows(&self, table_id: TableId, filters: &HashMap<String, String>) -> Result<Vec<RowRecord>> {
        let Some(rows) = self.rows.get(&table_id) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .filter(|row| matches_filters(row, filters))
            .take(SELECT_ROW_LIMIT as usize)
            .cloned()
            .collect())
    }

    async fn list_rows(&self, table_id: TableId, skip: i64, limit: i64) -> Result<Vec<RowRecord>> {
        let Some(rows) = self.rows.get(&table_id) else {
            return Ok(Vec::new());
        };
        Ok(rows.iter().skip(skip.max(0) as usize).take(limit.max(0) as usize).cloned().collect())
    }

    async fn insert_row(&self, table_id: TableId, data: Document) -> Result<RowRecord> {
        if !self.tables.contains_key(&table_id) {
            return Err(DbError::ForeignKeyViolation {
                constraint: Some("table_rows_table_id_fkey".to_string()),
                table: Some("table_rows".to_string()),
                message: "table does not exist".to_string(),
            });
        }
        let now = Utc::now();
        let row = RowRecord {
            id: Uuid::new_v4(),
            table_id,
            data: Value::Object(data),
            created_at: now,
            updated_at: now,
        };
        self.rows.entry(table_id).or_default().push(row.clone());
        Ok(row)
    }

    async fn merge_row(&self, table_id: TableId, row_id: RowId, patch: Document) -> Result<Option<RowRecord>> {
        let Some(mut rows) = self.rows.get_mut(&table_id) else {
            return Ok(None);
        };
        let Some(row) = rows.iter_mut().find(|row| row.id == row_id) else {
            return Ok(None);
        };
        row.data = shallow_merge(&row.data, &patch);
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn replace_row(&self, table_id: TableId, row_id: RowId, data: Document) -> Result<Option<RowRecord>> {
        let Some(mut rows) = self.rows.get_mut(&table_id) else {
            return Ok(None);
        };
        let Some(row) = rows.iter_mut().find(|row| row.id == row_id) else {
            return Ok(None);
        };
        row.data = Value::Object(data);
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete_row(&self, table_id: TableId, row_id: RowId) -> Result<bool> {
        let Some(mut rows) = self.rows.get_mut(&table_id) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|row| row.id != row_id);
        Ok(rows.len() < before)
    }

    async fn record_query_log(&self, entry: &QueryLogCreate) -> Result<()> {
        let record = QueryLogEntry {
            id: Uuid::new_v4(),
            database_id: entry.database_id,
            user_id: entry.user_id,
            method: entry.method.clone(),
            endpoint: entry.endpoint.clone(),
            status_code: entry.status_code,
            response_time_ms: entry.response_time_ms,
            request_body: entry.request_body.clone(),
            created_at: Utc::now(),
        };
        let mut logs = self.query_logs.write().expect("query log lock poisoned");
        logs.push(record);
        Ok(())
    }

    async fn list_query_logs(&self, filter: &QueryLogFilter) -> Result<Vec<QueryLogEntry>> {
        let logs = self.query_logs.read().expect("query log lock poisoned");
        Ok(logs
            .iter()
            .rev()
            .filter(|entry| filter.user_id.is_none_or(|user_id| entry.user_id == user_id))
            .filter(|entry| filter.database_id.is_none_or(|database_id| entry.database_id == database_id))
            .filter(|entry| filter.method.as_deref().is_none_or(|method| entry.method == method))
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn clear_query_logs(&self) -> Result<u64> {
        let mut logs = self.query_logs.write().expect("query log lock poisoned");
        let removed = logs.len() as u64;
        logs.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    async fn store_with_table() -> (MemStore, DatabaseId, TableId) {
        let store = MemStore::new();
        let database = store
            .create_database(&DatabaseCreateDBRequest {
                user_id: Uuid::new_v4(),
                name: "app".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let table = store
            .create_table(&TableCreateDBRequest {
                database_id: database.id,
                name: "users".to_string(),
                columns: vec![],
            })
            .await
            .unwrap();
        (store, database.id, table.id)
    }

    #[tokio::test]
    async fn insert_then_select_returns_superset_of_payload() {
        let (store, _, table_id) = store_with_table().await;
        store
            .insert_row(table_id, doc(json!({"name": "Ada", "age": 36})))
            .await
            .unwrap();

        let rows = store.select_rows(table_id, &HashMap::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].data["name"], json!("Ada"));
        assert_eq!(rows[0].data["age"], json!(36));
    }

    #[tokio::test]
    async fn select_is_ordered_by_creation_and_capped() {
        let (store, _, table_id) = store_with_table().await;
        for i in 0..120 {
            store.insert_row(table_id, doc(json!({"n": i}))).await.unwrap();
        }

        let rows = store.select_rows(table_id, &HashMap::new()).await.unwrap();
        assert_eq!(rows.len(), SELECT_ROW_LIMIT as usize);
        assert_eq!(rows[0].data["n"], json!(0));
        assert_eq!(rows[99].data["n"], json!(99));
    }

    #[tokio::test]
    async fn filters_are_anded_and_missing_fields_yield_empty() {
        let (store, _, table_id) = store_with_table().await;
        store
            .insert_row(table_id, doc(json!({"name": "Ada", "role": "admin"})))
            .await
            .unwrap();
        store
            .insert_row(table_id, doc(json!({"name": "Ada", "role": "viewer"})))
            .await
            .unwrap();

        let mut filters = HashMap::new();
        filters.insert("name".to_string(), "Ada".to_string());
        filters.insert("role".to_string(), "admin".to_string());
        let rows = store.select_rows(table_id, &filters).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].data["role"], json!("admin"));

        // Filtering on a field no row has is an empty result, not an error
        let mut absent = HashMap::new();
        absent.insert("nope".to_string(), "x".to_string());
        assert!(store.select_rows(table_id, &absent).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn filters_match_the_text_form_of_non_string_values() {
        let (store, _, table_id) = store_with_table().await;
        store.insert_row(table_id, doc(json!({"age": 36}))).await.unwrap();

        let mut filters = HashMap::new();
        filters.insert("age".to_string(), "36".to_string());
        assert_eq!(store.select_rows(table_id, &filters).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn merge_preserves_untouched_keys() {
        let (store, _, table_id) = store_with_table().await;
        let row = store
            .insert_row(table_id, doc(json!({"name": "Ada", "email": "a@x.com"})))
            .await
            .unwrap();

        let merged = store
            .merge_row(table_id, row.id, doc(json!({"name": "Ada L."})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(merged.data["name"], json!("Ada L."));
        assert_eq!(merged.data["email"], json!("a@x.com"));
    }

    #[tokio::test]
    async fn merge_on_missing_row_is_none() {
        let (store, _, table_id) = store_with_table().await;
        let result = store.merge_row(table_id, Uuid::new_v4(), doc(json!({"a": 1}))).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn delete_is_not_idempotent() {
        let (store, _, table_id) = store_with_table().await;
        let row = store.insert_row(table_id, doc(json!({"a": 1}))).await.unwrap();

        assert!(store.delete_row(table_id, row.id).await.unwrap());
        assert!(!store.delete_row(table_id, row.id).await.unwrap());
    }

    #[tokio::test]
    async fn rows_never_leak_across_same_named_tables() {
        let store = MemStore::new();
        let user_id = Uuid::new_v4();
        let mut table_ids = Vec::new();
        for database_name in ["one", "two"] {
            let database = store
                .create_database(&DatabaseCreateDBRequest {
                    user_id,
                    name: database_name.to_string(),
                    description: None,
                })
                .await
                .unwrap();
            let table = store
                .create_table(&TableCreateDBRequest {
                    database_id: database.id,
                    name: "users".to_string(),
                    columns: vec![],
                })
                .await
                .unwrap();
            table_ids.push((database.id, table.id));
        }

        store.insert_row(table_ids[0].1, doc(json!({"name": "Ada"}))).await.unwrap();

        let other_rows = store.select_rows(table_ids[1].1, &HashMap::new()).await.unwrap();
        assert!(other_rows.is_empty());

        // Resolution is scoped to the database, not the name
        let resolved = store.resolve_table(table_ids[1].0, "users").await.unwrap();
        assert_eq!(resolved, Some(table_ids[1].1));
        assert_ne!(resolved, Some(table_ids[0].1));
    }

    #[tokio::test]
    async fn duplicate_table_name_is_a_unique_violation() {
        let (store, database_id, _) = store_with_table().await;
        let err = store
            .create_table(&TableCreateDBRequest {
                database_id,
                name: "users".to_string(),
                columns: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn authenticate_rejects_unknown_and_inactive_keys() {
        let (store, database_id, _) = store_with_table().await;
        let key = store
            .create_api_key(&ApiKeyCreateDBRequest {
                database_id,
                user_id: Uuid::new_v4(),
                name: "Default".to_string(),
            })
            .await
            .unwrap();

        assert!(store.authenticate(&key.key_value).await.unwrap().is_some());
        assert!(store.authenticate("gb_doesnotexist").await.unwrap().is_none());

        store.set_api_key_active(key.id, false).await.unwrap();
        assert!(store.authenticate(&key.key_value).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn regenerate_invalidates_the_old_secret_immediately() {
        let (store, database_id, _) = store_with_table().await;
        let key = store
            .create_api_key(&ApiKeyCreateDBRequest {
                database_id,
                user_id: Uuid::new_v4(),
                name: "Default".to_string(),
            })
            .await
            .unwrap();
        let old_secret = key.key_value.clone();

        let regenerated = store.regenerate_api_key(key.id).await.unwrap().unwrap();
        assert_ne!(regenerated.key_value, old_secret);
        assert!(store.authenticate(&old_secret).await.unwrap().is_none());
        assert!(store.authenticate(&regenerated.key_value).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn database_delete_cascades_to_keys_tables_and_logs() {
        let (store, database_id, table_id) = store_with_table().await;
        let user_id = Uuid::new_v4();
        let key = store
            .create_api_key(&ApiKeyCreateDBRequest {
                database_id,
                user_id,
                name: "Default".to_string(),
            })
            .await
            .unwrap();
        store.insert_row(table_id, doc(json!({"a": 1}))).await.unwrap();
        store
            .record_query_log(&QueryLogCreate {
                database_id,
                user_id,
                method: "insert".to_string(),
                endpoint: "/users".to_string(),
                status_code: 201,
                response_time_ms: 3,
                request_body: json!({"action": "insert"}),
            })
            .await
            .unwrap();

        assert!(store.delete_database(database_id).await.unwrap());
        assert!(store.authenticate(&key.key_value).await.unwrap().is_none());
        assert!(store.get_table(table_id).await.unwrap().is_none());
        let logs = store
            .list_query_logs(&QueryLogFilter {
                limit: 100,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(logs.is_empty());
    }

    #[tokio::test]
    async fn query_logs_list_newest_first_and_clear() {
        let (store, database_id, _) = store_with_table().await;
        let user_id = Uuid::new_v4();
        for (i, method) in ["select", "insert"].iter().enumerate() {
            store
                .record_query_log(&QueryLogCreate {
                    database_id,
                    user_id,
                    method: method.to_string(),
                    endpoint: "/users".to_string(),
                    status_code: 200 + i as i32,
                    response_time_ms: i as i64,
                    request_body: json!({}),
                })
                .await
                .unwrap();
        }

        let logs = store
            .list_query_logs(&QueryLogFilter {
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].method, "insert");

        let filtered = store
            .list_query_logs(&QueryLogFilter {
                method: Some("select".to_string()),
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);

        assert_eq!(store.clear_query_logs().await.unwrap(), 2);
    }
}
